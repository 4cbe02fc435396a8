//! Observations and response actions attached to reports.
//!
//! Both carry an optional student back-reference. The report cascade only
//! fills it while it is unset; once a student is recorded it stays.

use super::{require_text, ValidationError};
use super::student::StudentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ObservationId = Uuid;
pub type ResponseActionId = Uuid;

/// Free-text observation about a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub uuid: ObservationId,
    pub student_uuid: Option<StudentId>,
    pub description: String,
    pub created_at: i64,
}

impl Observation {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            student_uuid: None,
            description: description.into(),
            created_at: super::now_epoch_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("observation.description", &self.description, usize::MAX)
    }
}

/// Named action taken in response to an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseAction {
    pub uuid: ResponseActionId,
    /// Unique across response actions.
    pub name: String,
    pub student_uuid: Option<StudentId>,
    pub created_at: i64,
}

impl ResponseAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            student_uuid: None,
            created_at: super::now_epoch_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("response_action.name", &self.name, 255)
    }
}
