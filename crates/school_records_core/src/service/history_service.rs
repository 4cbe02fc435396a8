//! History aggregation.
//!
//! # Invariants
//! - A student has at most one history, created lazily on first report.
//! - After every write here, `report_count` equals the size of the
//!   history's report set.

use crate::model::history::{History, HistoryId};
use crate::model::report::{Report, ReportId};
use crate::model::student::StudentId;
use crate::repo::history_repo::{HistoryListQuery, HistoryRepository};
use crate::repo::{RepoError, RepoResult};
use log::info;

pub struct HistoryService<R: HistoryRepository> {
    repo: R,
}

impl<R: HistoryRepository> HistoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Fetch-or-create the student's history, add `report` and recount.
    pub fn record_report(&self, student: StudentId, report: ReportId) -> RepoResult<History> {
        let history = self.repo.get_or_create_history(student)?;
        self.repo.add_report(history.uuid, report)?;
        self.repo.refresh_count(history.uuid)?;
        self.reload(student)
    }

    /// Replaces the history's report set with `reports` and recounts.
    pub fn rebuild(&self, student: StudentId, reports: &[ReportId]) -> RepoResult<History> {
        let history = self.repo.get_or_create_history(student)?;
        self.repo.replace_reports(history.uuid, reports)?;
        let count = self.repo.refresh_count(history.uuid)?;
        info!(
            "event=history_rebuild module=history_service status=ok history_id={} report_count={}",
            history.uuid, count
        );
        self.reload(student)
    }

    /// Histories currently holding `report`, to recount after it is gone.
    pub fn holders_of(&self, report: ReportId) -> RepoResult<Vec<HistoryId>> {
        self.repo.histories_containing(report)
    }

    /// Recomputes the cached count of each history.
    pub fn recount(&self, histories: &[HistoryId]) -> RepoResult<()> {
        for history in histories {
            self.repo.refresh_count(*history)?;
        }
        Ok(())
    }

    pub fn get_history(&self, student: StudentId) -> RepoResult<Option<History>> {
        self.repo.get_history_for_student(student)
    }

    /// Reports held by the history, newest first.
    pub fn history_reports(&self, history: HistoryId) -> RepoResult<Vec<Report>> {
        self.repo.list_history_reports(history)
    }

    pub fn list_histories(&self, query: &HistoryListQuery) -> RepoResult<Vec<History>> {
        self.repo.list_histories(query)
    }

    fn reload(&self, student: StudentId) -> RepoResult<History> {
        self.repo.get_history_for_student(student)?.ok_or_else(|| {
            RepoError::InvalidData(format!("history for student {student} vanished"))
        })
    }
}
