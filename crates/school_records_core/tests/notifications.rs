use rusqlite::Connection;
use school_records_core::db::open_db_in_memory;
use school_records_core::display::read_status_label;
use school_records_core::model::guardian::{Guardian, GuardianKind};
use school_records_core::model::student::Student;
use school_records_core::repo::guardian_repo::{GuardianRepository, SqliteGuardianRepository};
use school_records_core::repo::notification_repo::SqliteNotificationRepository;
use school_records_core::repo::student_repo::{SqliteStudentRepository, StudentRepository};
use school_records_core::service::notification_service::{new_report_message, NotificationService};
use school_records_core::{Condition, CoreConfig, RepoError, Report, ReportService};
use uuid::Uuid;

fn seed_student(conn: &Connection, name: &str) -> Student {
    let mut student = Student::new(name, "5");
    student.section = "A".to_string();
    SqliteStudentRepository::try_new(conn)
        .unwrap()
        .create_student(&student)
        .unwrap();
    student
}

fn notifications(conn: &Connection) -> NotificationService<SqliteNotificationRepository<'_>> {
    NotificationService::new(SqliteNotificationRepository::try_new(conn).unwrap())
}

#[test]
fn message_uses_condition_code() {
    assert_eq!(
        new_report_message("Ana", Condition::Violence),
        "New report for Ana: violencia"
    );
    assert_eq!(
        new_report_message("Bruno", Condition::ReportingSystemCase),
        "New report for Bruno: siseve"
    );
}

#[test]
fn creating_report_notifies_each_admin_once() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");
    let luis = Guardian::new(GuardianKind::Father, "Luis");
    SqliteGuardianRepository::try_new(&conn)
        .unwrap()
        .create_guardian(&luis)
        .unwrap();

    let mut report = Report::new(ana.uuid, Condition::Violence);
    report.father_uuid = Some(luis.uuid);
    let admins = vec!["director".to_string(), "coordinator".to_string()];
    let outcome = ReportService::new(&mut conn, &admins)
        .save_report(&report)
        .unwrap();
    assert_eq!(outcome.notifications_created, 2);

    let service = notifications(&conn);
    for admin in &admins {
        let inbox = service.list_for_recipient(admin, false).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].message, "New report for Ana: violencia");
        assert!(!inbox[0].is_read);
    }
}

#[test]
fn updating_report_sends_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");
    let admins = vec!["director".to_string()];

    let mut report = Report::new(ana.uuid, Condition::Violence);
    let mut service = ReportService::new(&mut conn, &admins);
    service.save_report(&report).unwrap();
    report.condition = Condition::ImproperTouching;
    let outcome = service.update_report(&report).unwrap();
    drop(service);

    assert!(!outcome.created);
    assert_eq!(outcome.notifications_created, 0);
    assert_eq!(notifications(&conn).unread_count("director").unwrap(), 1);
}

#[test]
fn duplicate_and_blank_recipients_are_collapsed() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");
    let config = CoreConfig {
        admin_recipients: vec![
            "director".to_string(),
            " director ".to_string(),
            "".to_string(),
            "coordinator".to_string(),
        ],
        ..CoreConfig::default()
    };

    let outcome = ReportService::new(&mut conn, &config)
        .save_report(&Report::new(ana.uuid, Condition::AlcoholUse))
        .unwrap();
    assert_eq!(outcome.notifications_created, 2);

    let service = notifications(&conn);
    assert_eq!(service.unread_count("director").unwrap(), 1);
    assert_eq!(service.unread_count("coordinator").unwrap(), 1);
}

#[test]
fn overlong_recipient_is_skipped_without_failing_save() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");
    let overlong = "x".repeat(151);
    let admins = vec![overlong.clone(), "director".to_string()];

    let report = Report::new(ana.uuid, Condition::Violence);
    let mut service = ReportService::new(&mut conn, &admins);
    let outcome = service.save_report(&report).unwrap();
    assert!(outcome.created);
    assert_eq!(outcome.notifications_created, 1);
    assert_eq!(outcome.history_count, 1);
    assert!(service.get_report(report.uuid).unwrap().is_some());
    drop(service);

    let service = notifications(&conn);
    assert_eq!(service.unread_count("director").unwrap(), 1);
    assert_eq!(service.unread_count(&overlong).unwrap(), 0);
}

#[test]
fn mark_read_is_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    let ana = seed_student(&conn, "Ana");
    ReportService::new(&mut conn, vec!["director".to_string()])
        .save_report(&Report::new(ana.uuid, Condition::Violence))
        .unwrap();

    let service = notifications(&conn);
    let inbox = service.list_for_recipient("director", true).unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(read_status_label(inbox[0].is_read), "📩 Unread");

    let read = service.mark_read(inbox[0].uuid).unwrap();
    assert!(read.is_read);
    assert_eq!(read_status_label(read.is_read), "✅ Read");
    let again = service.mark_read(inbox[0].uuid).unwrap();
    assert!(again.is_read);

    assert!(service.list_for_recipient("director", true).unwrap().is_empty());
    assert_eq!(service.list_for_recipient("director", false).unwrap().len(), 1);
    assert_eq!(service.unread_count("director").unwrap(), 0);
}

#[test]
fn mark_read_unknown_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let missing = Uuid::new_v4();

    let err = notifications(&conn).mark_read(missing).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "notification",
            id,
        } if id == missing
    ));
}
