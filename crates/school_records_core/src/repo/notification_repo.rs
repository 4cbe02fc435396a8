//! Notification repository contract and SQLite implementation.

use super::{
    bool_to_int, ensure_schema_ready, push_pagination, read_uuid, write_error, RepoError,
    RepoResult,
};
use crate::model::notification::{Notification, NotificationId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const NOTIFICATION_SELECT_SQL: &str =
    "SELECT uuid, recipient, message, is_read, created_at FROM notifications";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationListQuery {
    pub recipient: Option<String>,
    pub unread_only: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

pub trait NotificationRepository {
    fn create_notification(&self, notification: &Notification) -> RepoResult<NotificationId>;
    fn get_notification(&self, id: NotificationId) -> RepoResult<Option<Notification>>;
    /// Newest first.
    fn list_notifications(&self, query: &NotificationListQuery) -> RepoResult<Vec<Notification>>;
    /// Sets the read flag. Idempotent for already-read rows.
    fn mark_read(&self, id: NotificationId) -> RepoResult<()>;
    fn count_unread(&self, recipient: &str) -> RepoResult<u32>;
}

pub struct SqliteNotificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NotificationRepository for SqliteNotificationRepository<'_> {
    fn create_notification(&self, notification: &Notification) -> RepoResult<NotificationId> {
        notification.validate()?;
        self.conn
            .execute(
                "INSERT INTO notifications (uuid, recipient, message, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    notification.uuid.to_string(),
                    notification.recipient.as_str(),
                    notification.message.as_str(),
                    bool_to_int(notification.is_read),
                    notification.created_at,
                ],
            )
            .map_err(|err| write_error("notification", err))?;
        Ok(notification.uuid)
    }

    fn get_notification(&self, id: NotificationId) -> RepoResult<Option<Notification>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTIFICATION_SELECT_SQL} WHERE uuid = ?1;"))?;
        stmt.query_row([id.to_string()], |row| Ok(parse_notification_row(row)))
            .optional()?
            .transpose()
    }

    fn list_notifications(&self, query: &NotificationListQuery) -> RepoResult<Vec<Notification>> {
        let mut sql = format!("{NOTIFICATION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(recipient) = query.recipient.as_deref() {
            sql.push_str(" AND recipient = ?");
            bind_values.push(Value::Text(recipient.to_string()));
        }
        if query.unread_only {
            sql.push_str(" AND is_read = 0");
        }
        sql.push_str(" ORDER BY created_at DESC, uuid ASC");
        push_pagination(&mut sql, &mut bind_values, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notifications = Vec::new();
        while let Some(row) = rows.next()? {
            notifications.push(parse_notification_row(row)?);
        }
        Ok(notifications)
    }

    fn mark_read(&self, id: NotificationId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "notification",
                id,
            });
        }
        Ok(())
    }

    fn count_unread(&self, recipient: &str) -> RepoResult<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE recipient = ?1 AND is_read = 0;",
            [recipient],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<Notification> {
    let is_read = match row.get::<_, i64>("is_read")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_read value `{other}` in notifications.is_read"
            )));
        }
    };
    Ok(Notification {
        uuid: read_uuid(row, "notifications", "uuid")?,
        recipient: row.get("recipient")?,
        message: row.get("message")?,
        is_read,
        created_at: row.get("created_at")?,
    })
}
