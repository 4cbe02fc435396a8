use rusqlite::Connection;
use school_records_core::db::open_db_in_memory;
use school_records_core::model::follow_up::{Observation, ResponseAction};
use school_records_core::model::guardian::{Guardian, GuardianKind};
use school_records_core::model::student::{Student, Tutor};
use school_records_core::repo::follow_up_repo::{FollowUpRepository, SqliteFollowUpRepository};
use school_records_core::repo::guardian_repo::{GuardianRepository, SqliteGuardianRepository};
use school_records_core::repo::student_repo::{SqliteStudentRepository, StudentRepository};
use school_records_core::repo::tutor_repo::{SqliteTutorRepository, TutorRepository};
use school_records_core::{Condition, RepoError, Report, ReportService, ReportServiceError};
use uuid::Uuid;

fn admins() -> Vec<String> {
    vec!["director".to_string(), "coordinator".to_string()]
}

fn seed_student(conn: &Connection, name: &str) -> Student {
    let mut student = Student::new(name, "5");
    student.section = "A".to_string();
    SqliteStudentRepository::try_new(conn)
        .unwrap()
        .create_student(&student)
        .unwrap();
    student
}

fn seed_guardian(conn: &Connection, kind: GuardianKind, name: &str) -> Guardian {
    let guardian = Guardian::new(kind, name);
    SqliteGuardianRepository::try_new(conn)
        .unwrap()
        .create_guardian(&guardian)
        .unwrap();
    guardian
}

fn linked_names(conn: &Connection, kind: GuardianKind, guardian: Uuid) -> Vec<String> {
    SqliteGuardianRepository::try_new(conn)
        .unwrap()
        .list_linked_students(kind, guardian)
        .unwrap()
        .into_iter()
        .map(|student| student.name)
        .collect()
}

#[test]
fn saving_report_links_student_to_father() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");
    let luis = seed_guardian(&conn, GuardianKind::Father, "Luis");

    let mut report = Report::new(ana.uuid, Condition::Violence);
    report.father_uuid = Some(luis.uuid);
    let outcome = ReportService::new(&mut conn, admins())
        .save_report(&report)
        .unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.cascade.newly_linked, vec![GuardianKind::Father]);
    assert_eq!(outcome.history_count, 1);
    assert_eq!(outcome.notifications_created, 2);
    assert_eq!(linked_names(&conn, GuardianKind::Father, luis.uuid), vec!["Ana"]);
}

#[test]
fn resaving_report_is_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");
    let luis = seed_guardian(&conn, GuardianKind::Father, "Luis");

    let mut report = Report::new(ana.uuid, Condition::Violence);
    report.father_uuid = Some(luis.uuid);
    let mut service = ReportService::new(&mut conn, admins());
    service.save_report(&report).unwrap();
    let second = service.save_report(&report).unwrap();

    assert!(!second.created);
    assert!(second.cascade.newly_linked.is_empty());
    assert_eq!(second.history_count, 1);
    assert_eq!(second.notifications_created, 0);
    drop(service);
    assert_eq!(linked_names(&conn, GuardianKind::Father, luis.uuid), vec!["Ana"]);
}

#[test]
fn every_guardian_slot_is_linked() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");
    let luis = seed_guardian(&conn, GuardianKind::Father, "Luis");
    let rosa = seed_guardian(&conn, GuardianKind::Mother, "Rosa");
    let tia = seed_guardian(&conn, GuardianKind::LegalGuardian, "Tia Elena");

    let mut report = Report::new(ana.uuid, Condition::ClassEvasion);
    report.father_uuid = Some(luis.uuid);
    report.mother_uuid = Some(rosa.uuid);
    report.legal_guardian_uuid = Some(tia.uuid);
    let outcome = ReportService::new(&mut conn, admins())
        .save_report(&report)
        .unwrap();

    assert_eq!(outcome.cascade.newly_linked, GuardianKind::ALL.to_vec());
    assert_eq!(linked_names(&conn, GuardianKind::Mother, rosa.uuid), vec!["Ana"]);
    assert_eq!(
        linked_names(&conn, GuardianKind::LegalGuardian, tia.uuid),
        vec!["Ana"]
    );
}

#[test]
fn report_without_references_only_touches_history() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");

    let report = Report::new(ana.uuid, Condition::MedicalCertificate);
    let outcome = ReportService::new(&mut conn, Vec::<String>::new())
        .save_report(&report)
        .unwrap();

    assert!(outcome.cascade.newly_linked.is_empty());
    assert!(!outcome.cascade.response_action_claimed);
    assert!(!outcome.cascade.observation_claimed);
    assert_eq!(outcome.history_count, 1);
    assert_eq!(outcome.notifications_created, 0);
}

#[test]
fn follow_up_student_is_backfilled_once() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");
    let bruno = seed_student(&conn, "Bruno");
    let action = ResponseAction::new("Parent meeting");
    let observation = Observation::new("Pushed a classmate");
    {
        let follow_ups = SqliteFollowUpRepository::try_new(&conn).unwrap();
        follow_ups.create_response_action(&action).unwrap();
        follow_ups.create_observation(&observation).unwrap();
    }

    let mut first = Report::new(ana.uuid, Condition::Violence);
    first.response_action_uuid = Some(action.uuid);
    first.observation_uuid = Some(observation.uuid);
    let mut second = Report::new(bruno.uuid, Condition::Violence);
    second.response_action_uuid = Some(action.uuid);
    second.observation_uuid = Some(observation.uuid);

    let mut service = ReportService::new(&mut conn, admins());
    let first_outcome = service.save_report(&first).unwrap();
    let second_outcome = service.save_report(&second).unwrap();
    drop(service);

    assert!(first_outcome.cascade.response_action_claimed);
    assert!(first_outcome.cascade.observation_claimed);
    assert!(!second_outcome.cascade.response_action_claimed);
    assert!(!second_outcome.cascade.observation_claimed);

    let follow_ups = SqliteFollowUpRepository::try_new(&conn).unwrap();
    let stored_action = follow_ups.get_response_action(action.uuid).unwrap().unwrap();
    let stored_observation = follow_ups.get_observation(observation.uuid).unwrap().unwrap();
    assert_eq!(stored_action.student_uuid, Some(ana.uuid));
    assert_eq!(stored_observation.student_uuid, Some(ana.uuid));
}

#[test]
fn preassigned_follow_up_student_is_kept() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");
    let bruno = seed_student(&conn, "Bruno");
    let mut action = ResponseAction::new("Counseling");
    action.student_uuid = Some(bruno.uuid);
    SqliteFollowUpRepository::try_new(&conn)
        .unwrap()
        .create_response_action(&action)
        .unwrap();

    let mut report = Report::new(ana.uuid, Condition::AlcoholUse);
    report.response_action_uuid = Some(action.uuid);
    let outcome = ReportService::new(&mut conn, admins())
        .save_report(&report)
        .unwrap();

    assert!(!outcome.cascade.response_action_claimed);
    let stored = SqliteFollowUpRepository::try_new(&conn)
        .unwrap()
        .get_response_action(action.uuid)
        .unwrap()
        .unwrap();
    assert_eq!(stored.student_uuid, Some(bruno.uuid));
}

#[test]
fn unknown_student_is_rejected_without_writes() {
    let mut conn = open_db_in_memory().unwrap();
    let report = Report::new(Uuid::new_v4(), Condition::Violence);

    let err = ReportService::new(&mut conn, admins())
        .save_report(&report)
        .unwrap_err();
    assert!(matches!(err, ReportServiceError::StudentNotFound(id) if id == report.student_uuid));

    let reports: i64 = conn
        .query_row("SELECT COUNT(*) FROM reports;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(reports, 0);
}

#[test]
fn unknown_guardian_rolls_back_the_whole_save() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");

    let mut report = Report::new(ana.uuid, Condition::Violence);
    report.father_uuid = Some(Uuid::new_v4());
    let err = ReportService::new(&mut conn, admins())
        .save_report(&report)
        .unwrap_err();
    assert!(matches!(
        err,
        ReportServiceError::Repo(RepoError::InvalidReference { entity: "report", .. })
    ));

    for table in ["reports", "histories", "notifications"] {
        let rows: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(rows, 0, "{table} must stay empty");
    }
}

#[test]
fn deleting_tutor_nulls_report_reference() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");
    let tutor = Tutor::new("Carla", "Rojas", "5");
    SqliteTutorRepository::try_new(&conn)
        .unwrap()
        .create_tutor(&tutor)
        .unwrap();

    let mut report = Report::new(ana.uuid, Condition::Violence);
    report.tutor_uuid = Some(tutor.uuid);
    ReportService::new(&mut conn, admins())
        .save_report(&report)
        .unwrap();

    SqliteTutorRepository::try_new(&conn)
        .unwrap()
        .delete_tutor(tutor.uuid)
        .unwrap();

    let stored = ReportService::new(&mut conn, admins())
        .get_report(report.uuid)
        .unwrap()
        .unwrap();
    assert_eq!(stored.tutor_uuid, None);
}

#[test]
fn deleting_guardian_nulls_report_reference() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");
    let rosa = seed_guardian(&conn, GuardianKind::Mother, "Rosa");

    let mut report = Report::new(ana.uuid, Condition::Pregnancy);
    report.mother_uuid = Some(rosa.uuid);
    ReportService::new(&mut conn, admins())
        .save_report(&report)
        .unwrap();

    SqliteGuardianRepository::try_new(&conn)
        .unwrap()
        .delete_guardian(GuardianKind::Mother, rosa.uuid)
        .unwrap();

    let stored = ReportService::new(&mut conn, admins())
        .get_report(report.uuid)
        .unwrap()
        .unwrap();
    assert_eq!(stored.mother_uuid, None);
}

#[test]
fn deleting_student_removes_reports_history_and_links() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");
    let luis = seed_guardian(&conn, GuardianKind::Father, "Luis");

    let mut report = Report::new(ana.uuid, Condition::Violence);
    report.father_uuid = Some(luis.uuid);
    ReportService::new(&mut conn, admins())
        .save_report(&report)
        .unwrap();

    SqliteStudentRepository::try_new(&conn)
        .unwrap()
        .delete_student(ana.uuid)
        .unwrap();

    assert!(ReportService::new(&mut conn, admins())
        .get_report(report.uuid)
        .unwrap()
        .is_none());
    assert!(linked_names(&conn, GuardianKind::Father, luis.uuid).is_empty());
    let histories: i64 = conn
        .query_row("SELECT COUNT(*) FROM histories;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(histories, 0);
}

#[test]
fn deleting_observation_removes_reports_that_cite_it() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");
    let observation = Observation::new("Fight at recess");
    SqliteFollowUpRepository::try_new(&conn)
        .unwrap()
        .create_observation(&observation)
        .unwrap();

    let mut report = Report::new(ana.uuid, Condition::Violence);
    report.observation_uuid = Some(observation.uuid);
    ReportService::new(&mut conn, admins())
        .save_report(&report)
        .unwrap();

    SqliteFollowUpRepository::try_new(&conn)
        .unwrap()
        .delete_observation(observation.uuid)
        .unwrap();

    assert!(ReportService::new(&mut conn, admins())
        .get_report(report.uuid)
        .unwrap()
        .is_none());
}
