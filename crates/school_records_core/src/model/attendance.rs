//! Attendance justification record.

use super::student::StudentId;
use super::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type JustificationId = Uuid;

/// Excuse on file for a student's absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceJustification {
    pub uuid: JustificationId,
    pub student_uuid: StudentId,
    /// Epoch ms of the justified absence.
    pub justified_at: i64,
    pub description: String,
}

impl AttendanceJustification {
    pub fn new(student_uuid: StudentId, justified_at: i64, description: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            student_uuid,
            justified_at,
            description: description.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("attendance_justification.description", &self.description, usize::MAX)
    }
}
