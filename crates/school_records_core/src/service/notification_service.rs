//! Admin notification emission and read-state handling.
//!
//! Recipients come from an injected [`RecipientDirectory`] instead of a
//! global user lookup.

use crate::config::CoreConfig;
use crate::model::notification::{Notification, NotificationId, MAX_RECIPIENT_CHARS};
use crate::model::report::Condition;
use crate::repo::notification_repo::{NotificationListQuery, NotificationRepository};
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use std::collections::HashSet;

/// Source of the administrative users to notify.
pub trait RecipientDirectory {
    fn admin_recipients(&self) -> Vec<String>;
}

impl RecipientDirectory for [String] {
    fn admin_recipients(&self) -> Vec<String> {
        self.to_vec()
    }
}

impl RecipientDirectory for Vec<String> {
    fn admin_recipients(&self) -> Vec<String> {
        self.clone()
    }
}

impl RecipientDirectory for CoreConfig {
    fn admin_recipients(&self) -> Vec<String> {
        self.admin_recipients.clone()
    }
}

impl<T: RecipientDirectory + ?Sized> RecipientDirectory for &T {
    fn admin_recipients(&self) -> Vec<String> {
        (**self).admin_recipients()
    }
}

/// Message text for a newly filed report.
pub fn new_report_message(student_name: &str, condition: Condition) -> String {
    format!("New report for {student_name}: {}", condition.code())
}

pub struct NotificationService<R: NotificationRepository> {
    repo: R,
}

impl<R: NotificationRepository> NotificationService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one unread notification per distinct, non-blank recipient.
    ///
    /// Identifiers longer than [`MAX_RECIPIENT_CHARS`] are skipped with a
    /// warning.
    pub fn emit_new_report<D>(
        &self,
        recipients: &D,
        student_name: &str,
        condition: Condition,
    ) -> RepoResult<Vec<Notification>>
    where
        D: RecipientDirectory + ?Sized,
    {
        let message = new_report_message(student_name, condition);
        let mut seen = HashSet::new();
        let mut created = Vec::new();

        for recipient in recipients.admin_recipients() {
            let recipient = recipient.trim().to_string();
            if recipient.is_empty() || !seen.insert(recipient.clone()) {
                continue;
            }
            let length = recipient.chars().count();
            if length > MAX_RECIPIENT_CHARS {
                warn!(
                    "event=notifications_emit module=notification_service status=skipped reason=recipient_too_long recipient_chars={} max_chars={}",
                    length, MAX_RECIPIENT_CHARS
                );
                continue;
            }
            let notification = Notification::new(recipient, message.as_str());
            self.repo.create_notification(&notification)?;
            created.push(notification);
        }

        info!(
            "event=notifications_emit module=notification_service status=ok condition={} count={}",
            condition.code(),
            created.len()
        );
        Ok(created)
    }

    /// Flags one notification as read and returns its new state.
    pub fn mark_read(&self, id: NotificationId) -> RepoResult<Notification> {
        self.repo.mark_read(id)?;
        self.repo
            .get_notification(id)?
            .ok_or(RepoError::NotFound {
                entity: "notification",
                id,
            })
    }

    pub fn list_for_recipient(
        &self,
        recipient: &str,
        unread_only: bool,
    ) -> RepoResult<Vec<Notification>> {
        self.repo.list_notifications(&NotificationListQuery {
            recipient: Some(recipient.to_string()),
            unread_only,
            ..NotificationListQuery::default()
        })
    }

    pub fn unread_count(&self, recipient: &str) -> RepoResult<u32> {
        self.repo.count_unread(recipient)
    }
}
