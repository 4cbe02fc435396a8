//! Per-student report history.

use super::report::ReportId;
use super::student::StudentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type HistoryId = Uuid;

/// Aggregate of every report filed for one student.
///
/// `report_count` is a cache of `report_uuids.len()`; the history service
/// recomputes it on every report save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    pub uuid: HistoryId,
    pub student_uuid: StudentId,
    pub report_count: u32,
    /// Sorted ascending for deterministic comparisons.
    pub report_uuids: Vec<ReportId>,
    pub updated_at: i64,
}

impl History {
    /// Whether the cached count matches the collection.
    pub fn is_consistent(&self) -> bool {
        self.report_uuids.len() == self.report_count as usize
    }
}
