//! Student and tutor records.
//!
//! # Invariants
//! - `national_id`, when present, is unique across students.
//! - Tutor `name` and `surname` are each unique across tutors.

use super::{limit_text, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type StudentId = Uuid;
pub type TutorId = Uuid;

/// Enrolled student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub uuid: StudentId,
    pub name: String,
    /// National identity document number, up to 8 characters.
    pub national_id: Option<String>,
    /// Single-character grade code.
    pub grade: String,
    /// Single-character section code, may be empty.
    pub section: String,
    /// Human-readable section name, may be empty.
    pub section_label: String,
}

impl Student {
    pub fn new(name: impl Into<String>, grade: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            national_id: None,
            grade: grade.into(),
            section: String::new(),
            section_label: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("student.name", &self.name, 100)?;
        if let Some(national_id) = self.national_id.as_deref() {
            require_text("student.national_id", national_id, 8)?;
        }
        require_text("student.grade", &self.grade, 1)?;
        limit_text("student.section", &self.section, 1)?;
        limit_text("student.section_label", &self.section_label, 25)?;
        Ok(())
    }
}

/// Homeroom tutor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tutor {
    pub uuid: TutorId,
    pub name: String,
    pub surname: String,
    pub grade: String,
    pub section: String,
}

impl Tutor {
    pub fn new(
        name: impl Into<String>,
        surname: impl Into<String>,
        grade: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            surname: surname.into(),
            grade: grade.into(),
            section: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("tutor.name", &self.name, 100)?;
        require_text("tutor.surname", &self.surname, 100)?;
        require_text("tutor.grade", &self.grade, 1)?;
        limit_text("tutor.section", &self.section, 15)?;
        Ok(())
    }
}
