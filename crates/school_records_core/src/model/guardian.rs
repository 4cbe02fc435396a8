//! Responsible adults linked to students.
//!
//! Fathers, mothers and legal guardians share one record shape but live in
//! separate tables, so a report's father slot can only ever point at a
//! father row.

use super::{limit_text, require_text, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GuardianId = Uuid;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 \-]*$").expect("valid phone regex"));

/// Relationship of a responsible adult to the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardianKind {
    Father,
    Mother,
    LegalGuardian,
}

impl GuardianKind {
    pub const ALL: [GuardianKind; 3] = [Self::Father, Self::Mother, Self::LegalGuardian];

    /// Stable lowercase name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Father => "father",
            Self::Mother => "mother",
            Self::LegalGuardian => "legal_guardian",
        }
    }
}

/// Father, mother or legal guardian of one or more students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardian {
    pub uuid: GuardianId,
    pub kind: GuardianKind,
    pub name: String,
    pub phone: Option<String>,
}

impl Guardian {
    pub fn new(kind: GuardianKind, name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind,
            name: name.into(),
            phone: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("guardian.name", &self.name, 100)?;
        if let Some(phone) = self.phone.as_deref() {
            limit_text("guardian.phone", phone, 15)?;
            if !phone.is_empty() && !PHONE_RE.is_match(phone) {
                return Err(ValidationError::Malformed {
                    field: "guardian.phone",
                    value: phone.to_string(),
                });
            }
        }
        Ok(())
    }
}
