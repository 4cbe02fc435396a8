//! Domain model for school incident records.
//!
//! # Responsibility
//! - Define the canonical records used by repositories and services.
//! - Own field-level validation shared by every write path.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - Timestamps are Unix epoch milliseconds.
//! - Text limits are counted in characters, not bytes.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod attendance;
pub mod follow_up;
pub mod guardian;
pub mod history;
pub mod notification;
pub mod report;
pub mod student;

/// Field-level validation failure raised before any SQL mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text is empty after trimming.
    Blank { field: &'static str },
    /// Text exceeds its character limit.
    TooLong {
        field: &'static str,
        max_chars: usize,
        actual: usize,
    },
    /// Text does not match the expected shape.
    Malformed { field: &'static str, value: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank { field } => write!(f, "{field} must not be blank"),
            Self::TooLong {
                field,
                max_chars,
                actual,
            } => write!(
                f,
                "{field} allows at most {max_chars} characters, got {actual}"
            ),
            Self::Malformed { field, value } => write!(f, "{field} is malformed: `{value}`"),
        }
    }
}

impl Error for ValidationError {}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { field });
    }
    limit_text(field, value, max_chars)
}

pub(crate) fn limit_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max_chars {
        return Err(ValidationError::TooLong {
            field,
            max_chars,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{limit_text, require_text, ValidationError};

    #[test]
    fn require_text_rejects_whitespace_only() {
        assert_eq!(
            require_text("name", "   ", 10),
            Err(ValidationError::Blank { field: "name" })
        );
    }

    #[test]
    fn limit_text_counts_characters() {
        // 5 chars, 10 bytes
        assert!(limit_text("label", "ñññññ", 5).is_ok());
        assert!(matches!(
            limit_text("label", "ñññññn", 5),
            Err(ValidationError::TooLong { actual: 6, .. })
        ));
    }
}
