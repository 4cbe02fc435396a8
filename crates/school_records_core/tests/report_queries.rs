use rusqlite::Connection;
use school_records_core::db::open_db_in_memory;
use school_records_core::display::{HistoryRow, ReportRow};
use school_records_core::model::follow_up::{Observation, ResponseAction};
use school_records_core::model::guardian::{Guardian, GuardianKind};
use school_records_core::model::student::{Student, Tutor};
use school_records_core::repo::follow_up_repo::{FollowUpRepository, SqliteFollowUpRepository};
use school_records_core::repo::guardian_repo::{GuardianRepository, SqliteGuardianRepository};
use school_records_core::repo::report_repo::ReportListQuery;
use school_records_core::repo::student_repo::{SqliteStudentRepository, StudentRepository};
use school_records_core::repo::tutor_repo::{SqliteTutorRepository, TutorRepository};
use school_records_core::{Condition, Report, ReportService, ReportServiceError};
use uuid::Uuid;

struct School {
    ana: Student,
    bruno: Student,
    tutor: Tutor,
    action: ResponseAction,
}

fn seed_school(conn: &Connection) -> School {
    let students = SqliteStudentRepository::try_new(conn).unwrap();
    let mut ana = Student::new("Ana", "5");
    ana.section = "A".to_string();
    ana.national_id = Some("71234567".to_string());
    let bruno = Student::new("Bruno", "3");
    students.create_student(&ana).unwrap();
    students.create_student(&bruno).unwrap();

    let tutor = Tutor::new("Carla", "Rojas", "5");
    SqliteTutorRepository::try_new(conn)
        .unwrap()
        .create_tutor(&tutor)
        .unwrap();

    let action = ResponseAction::new("Parent meeting");
    SqliteFollowUpRepository::try_new(conn)
        .unwrap()
        .create_response_action(&action)
        .unwrap();

    School {
        ana,
        bruno,
        tutor,
        action,
    }
}

fn report_at(student: &Student, condition: Condition, reported_at: i64) -> Report {
    let mut report = Report::new(student.uuid, condition);
    report.reported_at = reported_at;
    report
}

#[test]
fn list_is_newest_first_and_filterable() {
    let mut conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);

    let mut oldest = report_at(&school.ana, Condition::Violence, 1_000);
    oldest.tutor_uuid = Some(school.tutor.uuid);
    let mut middle = report_at(&school.bruno, Condition::AlcoholUse, 2_000);
    middle.response_action_uuid = Some(school.action.uuid);
    let newest = report_at(&school.ana, Condition::ClassEvasion, 3_000);

    let mut service = ReportService::new(&mut conn, Vec::<String>::new());
    for report in [&oldest, &middle, &newest] {
        service.save_report(report).unwrap();
    }

    let ids = |query: ReportListQuery| -> Vec<Uuid> {
        service
            .list_reports(&query)
            .unwrap()
            .into_iter()
            .map(|report| report.uuid)
            .collect()
    };

    assert_eq!(
        ids(ReportListQuery::default()),
        vec![newest.uuid, middle.uuid, oldest.uuid]
    );
    assert_eq!(
        ids(ReportListQuery {
            condition: Some(Condition::AlcoholUse),
            ..ReportListQuery::default()
        }),
        vec![middle.uuid]
    );
    assert_eq!(
        ids(ReportListQuery {
            student_uuid: Some(school.ana.uuid),
            ..ReportListQuery::default()
        }),
        vec![newest.uuid, oldest.uuid]
    );
    assert_eq!(
        ids(ReportListQuery {
            tutor_uuid: Some(school.tutor.uuid),
            ..ReportListQuery::default()
        }),
        vec![oldest.uuid]
    );
    assert_eq!(
        ids(ReportListQuery {
            response_action_uuid: Some(school.action.uuid),
            ..ReportListQuery::default()
        }),
        vec![middle.uuid]
    );
    assert_eq!(
        ids(ReportListQuery {
            limit: Some(1),
            offset: 1,
            ..ReportListQuery::default()
        }),
        vec![middle.uuid]
    );
}

#[test]
fn search_covers_name_national_id_and_condition_code() {
    let mut conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let ana_report = report_at(&school.ana, Condition::Violence, 1_000);
    let bruno_report = report_at(&school.bruno, Condition::AlcoholUse, 2_000);

    let mut service = ReportService::new(&mut conn, Vec::<String>::new());
    service.save_report(&ana_report).unwrap();
    service.save_report(&bruno_report).unwrap();

    let search = |text: &str| -> Vec<Uuid> {
        service
            .list_reports(&ReportListQuery {
                search: Some(text.to_string()),
                ..ReportListQuery::default()
            })
            .unwrap()
            .into_iter()
            .map(|report| report.uuid)
            .collect()
    };

    assert_eq!(search("bruno"), vec![bruno_report.uuid]);
    assert_eq!(search("7123"), vec![ana_report.uuid]);
    assert_eq!(search("alcohol"), vec![bruno_report.uuid]);
    assert_eq!(search("  "), vec![bruno_report.uuid, ana_report.uuid]);
}

#[test]
fn create_and_update_enforce_existence() {
    let mut conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let report = Report::new(school.ana.uuid, Condition::Violence);
    let mut service = ReportService::new(&mut conn, Vec::<String>::new());

    assert!(matches!(
        service.update_report(&report).unwrap_err(),
        ReportServiceError::ReportNotFound(id) if id == report.uuid
    ));
    assert!(service.create_report(&report).unwrap().created);
    assert!(matches!(
        service.create_report(&report).unwrap_err(),
        ReportServiceError::ReportAlreadyExists(id) if id == report.uuid
    ));
}

#[test]
fn detail_resolves_every_reference() {
    let mut conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let luis = Guardian::new(GuardianKind::Father, "Luis");
    SqliteGuardianRepository::try_new(&conn)
        .unwrap()
        .create_guardian(&luis)
        .unwrap();
    let observation = Observation::new("Fight at recess");
    SqliteFollowUpRepository::try_new(&conn)
        .unwrap()
        .create_observation(&observation)
        .unwrap();

    let mut report = Report::new(school.ana.uuid, Condition::Violence);
    report.father_uuid = Some(luis.uuid);
    report.tutor_uuid = Some(school.tutor.uuid);
    report.response_action_uuid = Some(school.action.uuid);
    report.observation_uuid = Some(observation.uuid);

    let mut service = ReportService::new(&mut conn, Vec::<String>::new());
    service.save_report(&report).unwrap();
    let detail = service.get_report_detail(report.uuid).unwrap();

    assert_eq!(detail.report, report);
    assert_eq!(detail.student, school.ana);
    assert_eq!(detail.father, Some(luis));
    assert!(detail.mother.is_none());
    assert!(detail.legal_guardian.is_none());
    assert_eq!(detail.tutor, Some(school.tutor));
    let action = detail.response_action.clone().unwrap();
    assert_eq!(action.student_uuid, Some(school.ana.uuid));
    let stored_observation = detail.observation.clone().unwrap();
    assert_eq!(stored_observation.student_uuid, Some(school.ana.uuid));

    let row = ReportRow::from_detail(&detail);
    assert_eq!(row.student, "Ana - 71234567");
    assert_eq!(row.condition, "Violence");
    assert_eq!(row.father, "Luis");
    assert_eq!(row.mother, "No mother registered");
    assert_eq!(row.legal_guardian, "No legal guardian registered");
    assert_eq!(row.tutor, "Carla Rojas");
    assert_eq!(row.response_action, "Parent meeting");
}

#[test]
fn detail_of_unknown_report_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let missing = Uuid::new_v4();

    let err = ReportService::new(&mut conn, Vec::<String>::new())
        .get_report_detail(missing)
        .unwrap_err();
    assert!(matches!(err, ReportServiceError::ReportNotFound(id) if id == missing));
}

#[test]
fn history_view_feeds_history_row() {
    let mut conn = open_db_in_memory().unwrap();
    let school = seed_school(&conn);
    let mut service = ReportService::new(&mut conn, Vec::<String>::new());
    service
        .save_report(&Report::new(school.ana.uuid, Condition::Violence))
        .unwrap();

    let view = service.student_history(school.ana.uuid).unwrap();
    let history = view.history.unwrap();
    let row = HistoryRow::new(&view.student, &history);
    assert_eq!(row.student, "Ana - 71234567");
    assert_eq!(row.report_count, 1);
    assert_eq!(view.reports.len(), 1);
}
