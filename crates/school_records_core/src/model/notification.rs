//! Admin-facing notification record.

use super::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type NotificationId = Uuid;

/// Longest recipient identifier a notification can be addressed to.
pub const MAX_RECIPIENT_CHARS: usize = 150;

/// Message addressed to one administrative recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub uuid: NotificationId,
    /// Opaque identifier of the administrative user.
    pub recipient: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: i64,
}

impl Notification {
    /// Creates an unread notification stamped with the current time.
    pub fn new(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            recipient: recipient.into(),
            message: message.into(),
            is_read: false,
            created_at: super::now_epoch_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("notification.recipient", &self.recipient, MAX_RECIPIENT_CHARS)?;
        require_text("notification.message", &self.message, usize::MAX)
    }
}
