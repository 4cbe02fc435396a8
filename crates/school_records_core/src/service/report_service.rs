//! Report use-case service.
//!
//! # Responsibility
//! - Save reports and run their follow-on rules in a fixed order:
//!   report row, guardian links, follow-up back-fill, history, then
//!   notifications (creation only).
//! - Provide the list, detail, delete and per-student history views.
//!
//! # Invariants
//! - A save or delete runs in one immediate transaction; on error nothing
//!   is written.
//! - Updating an existing report never emits notifications.
//! - History counts are recounted after a report is deleted.

use crate::model::follow_up::{Observation, ResponseAction};
use crate::model::guardian::{Guardian, GuardianKind};
use crate::model::history::History;
use crate::model::report::{Report, ReportId};
use crate::model::student::{Student, StudentId, Tutor};
use crate::repo::follow_up_repo::{FollowUpRepository, SqliteFollowUpRepository};
use crate::repo::guardian_repo::{GuardianRepository, SqliteGuardianRepository};
use crate::repo::history_repo::SqliteHistoryRepository;
use crate::repo::notification_repo::SqliteNotificationRepository;
use crate::repo::report_repo::{ReportListQuery, ReportRepository, SqliteReportRepository};
use crate::repo::student_repo::{SqliteStudentRepository, StudentRepository};
use crate::repo::tutor_repo::{SqliteTutorRepository, TutorRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::history_service::HistoryService;
use crate::service::notification_service::{NotificationService, RecipientDirectory};
use crate::service::report_cascade::{apply_cascade, CascadeOutcome};
use log::{error, info};
use rusqlite::{Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

#[derive(Debug)]
pub enum ReportServiceError {
    StudentNotFound(StudentId),
    ReportNotFound(ReportId),
    /// `create_report` was given an id that is already stored.
    ReportAlreadyExists(ReportId),
    Repo(RepoError),
}

impl Display for ReportServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StudentNotFound(id) => write!(f, "student not found: {id}"),
            Self::ReportNotFound(id) => write!(f, "report not found: {id}"),
            Self::ReportAlreadyExists(id) => write!(f, "report already exists: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReportServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ReportServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "student",
                id,
            } => Self::StudentNotFound(id),
            RepoError::NotFound {
                entity: "report",
                id,
            } => Self::ReportNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for ReportServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// What one report save did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSaveOutcome {
    pub report_uuid: ReportId,
    /// `false` when an existing report was updated.
    pub created: bool,
    pub cascade: CascadeOutcome,
    /// Report count of the student's history after the save.
    pub history_count: u32,
    pub notifications_created: usize,
}

/// Report with every reference resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDetail {
    pub report: Report,
    pub student: Student,
    pub father: Option<Guardian>,
    pub mother: Option<Guardian>,
    pub legal_guardian: Option<Guardian>,
    pub tutor: Option<Tutor>,
    pub response_action: Option<ResponseAction>,
    pub observation: Option<Observation>,
}

/// Per-student history screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentHistoryView {
    pub student: Student,
    /// `None` until the first report is saved.
    pub history: Option<History>,
    /// Reports held by the history, newest first.
    pub reports: Vec<Report>,
}

pub struct ReportService<'conn, D: RecipientDirectory> {
    conn: &'conn mut Connection,
    recipients: D,
}

impl<'conn, D: RecipientDirectory> ReportService<'conn, D> {
    /// `recipients` supplies the admins notified on report creation.
    pub fn new(conn: &'conn mut Connection, recipients: D) -> Self {
        Self { conn, recipients }
    }

    /// Inserts or updates `report` and runs every follow-on rule.
    pub fn save_report(&mut self, report: &Report) -> Result<ReportSaveOutcome, ReportServiceError> {
        let started_at = Instant::now();
        let result = self.save_in_transaction(report);
        match &result {
            Ok(outcome) => info!(
                "event=report_save module=report_service status=ok report_id={} created={} guardians_linked={} action_claimed={} observation_claimed={} history_count={} notifications={} duration_ms={}",
                outcome.report_uuid,
                outcome.created,
                outcome.cascade.newly_linked.len(),
                outcome.cascade.response_action_claimed,
                outcome.cascade.observation_claimed,
                outcome.history_count,
                outcome.notifications_created,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=report_save module=report_service status=error report_id={} duration_ms={} error={}",
                report.uuid,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Saves a report whose id must not exist yet.
    pub fn create_report(
        &mut self,
        report: &Report,
    ) -> Result<ReportSaveOutcome, ReportServiceError> {
        if self.reports()?.report_exists(report.uuid)? {
            return Err(ReportServiceError::ReportAlreadyExists(report.uuid));
        }
        self.save_report(report)
    }

    /// Saves a report whose id must already exist.
    pub fn update_report(
        &mut self,
        report: &Report,
    ) -> Result<ReportSaveOutcome, ReportServiceError> {
        if !self.reports()?.report_exists(report.uuid)? {
            return Err(ReportServiceError::ReportNotFound(report.uuid));
        }
        self.save_report(report)
    }

    /// Deletes a report and recounts every history that held it.
    pub fn delete_report(&mut self, id: ReportId) -> Result<(), ReportServiceError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let history = HistoryService::new(SqliteHistoryRepository::try_new(&tx)?);
            let holders = history.holders_of(id)?;
            SqliteReportRepository::try_new(&tx)?.delete_report(id)?;
            history.recount(&holders)?;
            info!(
                "event=report_delete module=report_service status=ok report_id={} histories_recounted={}",
                id,
                holders.len()
            );
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_report(&self, id: ReportId) -> Result<Option<Report>, ReportServiceError> {
        Ok(self.reports()?.get_report(id)?)
    }

    pub fn list_reports(&self, query: &ReportListQuery) -> Result<Vec<Report>, ReportServiceError> {
        Ok(self.reports()?.list_reports(query)?)
    }

    /// Loads a report together with every record it references.
    pub fn get_report_detail(&self, id: ReportId) -> Result<ReportDetail, ReportServiceError> {
        let conn: &Connection = &*self.conn;
        let report = self
            .reports()?
            .get_report(id)?
            .ok_or(ReportServiceError::ReportNotFound(id))?;
        let student = load_student(conn, report.student_uuid)?;

        let guardians = SqliteGuardianRepository::try_new(conn)?;
        let load_guardian = |kind: GuardianKind| -> RepoResult<Option<Guardian>> {
            match report.guardian(kind) {
                Some(guardian) => guardians.get_guardian(kind, guardian),
                None => Ok(None),
            }
        };
        let father = load_guardian(GuardianKind::Father)?;
        let mother = load_guardian(GuardianKind::Mother)?;
        let legal_guardian = load_guardian(GuardianKind::LegalGuardian)?;

        let tutor = match report.tutor_uuid {
            Some(tutor) => SqliteTutorRepository::try_new(conn)?.get_tutor(tutor)?,
            None => None,
        };
        let follow_ups = SqliteFollowUpRepository::try_new(conn)?;
        let response_action = match report.response_action_uuid {
            Some(action) => follow_ups.get_response_action(action)?,
            None => None,
        };
        let observation = match report.observation_uuid {
            Some(observation) => follow_ups.get_observation(observation)?,
            None => None,
        };

        Ok(ReportDetail {
            report,
            student,
            father,
            mother,
            legal_guardian,
            tutor,
            response_action,
            observation,
        })
    }

    /// Student, history and held reports for the history screen.
    pub fn student_history(
        &self,
        student: StudentId,
    ) -> Result<StudentHistoryView, ReportServiceError> {
        let conn: &Connection = &*self.conn;
        let student = load_student(conn, student)?;
        let history_service = HistoryService::new(SqliteHistoryRepository::try_new(conn)?);
        let history = history_service.get_history(student.uuid)?;
        let reports = match &history {
            Some(history) => history_service.history_reports(history.uuid)?,
            None => Vec::new(),
        };
        Ok(StudentHistoryView {
            student,
            history,
            reports,
        })
    }

    /// Resets the student's history to exactly the reports filed for them.
    pub fn rebuild_history(&mut self, student: StudentId) -> Result<History, ReportServiceError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let history = {
            load_student(&tx, student)?;
            let report_ids = SqliteReportRepository::try_new(&tx)?.list_report_ids_for_student(student)?;
            HistoryService::new(SqliteHistoryRepository::try_new(&tx)?).rebuild(student, &report_ids)?
        };
        tx.commit()?;
        Ok(history)
    }

    fn reports(&self) -> RepoResult<SqliteReportRepository<'_>> {
        SqliteReportRepository::try_new(&*self.conn)
    }

    fn save_in_transaction(
        &mut self,
        report: &Report,
    ) -> Result<ReportSaveOutcome, ReportServiceError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = {
            let student = load_student(&tx, report.student_uuid)?;

            let reports = SqliteReportRepository::try_new(&tx)?;
            let created = !reports.report_exists(report.uuid)?;
            if created {
                reports.insert_report(report)?;
            } else {
                reports.update_report(report)?;
            }

            let cascade = apply_cascade(
                &SqliteGuardianRepository::try_new(&tx)?,
                &SqliteFollowUpRepository::try_new(&tx)?,
                report,
            )?;

            let history = HistoryService::new(SqliteHistoryRepository::try_new(&tx)?)
                .record_report(report.student_uuid, report.uuid)?;

            let notifications_created = if created {
                NotificationService::new(SqliteNotificationRepository::try_new(&tx)?)
                    .emit_new_report(&self.recipients, &student.name, report.condition)?
                    .len()
            } else {
                0
            };

            ReportSaveOutcome {
                report_uuid: report.uuid,
                created,
                cascade,
                history_count: history.report_count,
                notifications_created,
            }
        };
        tx.commit()?;
        Ok(outcome)
    }
}

fn load_student(conn: &Connection, id: StudentId) -> Result<Student, ReportServiceError> {
    SqliteStudentRepository::try_new(conn)?
        .get_student(id)?
        .ok_or(ReportServiceError::StudentNotFound(id))
}
