//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define entity-oriented data access contracts.
//! - Keep SQL details out of the service/cascade orchestration.
//!
//! # Invariants
//! - Write paths call the model `validate()` before SQL mutations.
//! - Constraint failures are returned as semantic errors (`Duplicate`,
//!   `InvalidReference`) rather than raw SQLite codes.
//! - Repositories only accept connections migrated to the latest version.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::ValidationError;
use rusqlite::types::Value;
use rusqlite::{ffi, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod attendance_repo;
pub mod follow_up_repo;
pub mod guardian_repo;
pub mod history_repo;
pub mod notification_repo;
pub mod report_repo;
pub mod student_repo;
pub mod tutor_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error shared by every repository.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound {
        entity: &'static str,
        id: Uuid,
    },
    /// A unique constraint rejected the write.
    Duplicate {
        entity: &'static str,
        detail: String,
    },
    /// A foreign key points at a record that does not exist.
    InvalidReference {
        entity: &'static str,
        detail: String,
    },
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Duplicate { entity, detail } => write!(f, "duplicate {entity}: {detail}"),
            Self::InvalidReference { entity, detail } => {
                write!(f, "{entity} references a missing record: {detail}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Rejects connections that were not opened through `db::open_*`.
pub(crate) fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version = current_version(conn)?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

/// Maps constraint failures of a write on `entity` to semantic errors.
pub(crate) fn write_error(entity: &'static str, err: rusqlite::Error) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        let detail = message.clone().unwrap_or_else(|| failure.to_string());
        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return RepoError::Duplicate { entity, detail };
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return RepoError::InvalidReference { entity, detail };
            }
            _ => {}
        }
    }
    RepoError::from(err)
}

pub(crate) fn read_uuid(row: &Row<'_>, table: &str, column: &str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    parse_uuid(&text, table, column)
}

pub(crate) fn read_optional_uuid(
    row: &Row<'_>,
    table: &str,
    column: &str,
) -> RepoResult<Option<Uuid>> {
    match row.get::<_, Option<String>>(column)? {
        Some(text) => parse_uuid(&text, table, column).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn parse_uuid(text: &str, table: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{text}` in {table}.{column}")))
}

pub(crate) fn optional_uuid_text(value: Option<Uuid>) -> Option<String> {
    value.map(|id| id.to_string())
}

/// Builds a `LIKE` pattern for substring search, `None` for blank input.
///
/// Matches must use `ESCAPE '\'`.
fn like_pattern(search: Option<&str>) -> Option<String> {
    let trimmed = search?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut escaped = String::with_capacity(trimmed.len() + 2);
    escaped.push('%');
    for ch in trimmed.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    Some(escaped)
}

/// Appends an `AND (col LIKE ? OR ...)` clause matching `search` on any of
/// `columns`. Blank searches add nothing.
pub(crate) fn push_search(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    search: Option<&str>,
    columns: &[&str],
) {
    let Some(pattern) = like_pattern(search) else {
        return;
    };
    let clauses: Vec<String> = columns
        .iter()
        .map(|column| format!("{column} LIKE ? ESCAPE '\\'"))
        .collect();
    sql.push_str(" AND (");
    sql.push_str(&clauses.join(" OR "));
    sql.push(')');
    for _ in columns {
        bind_values.push(Value::Text(pattern.clone()));
    }
}

/// Appends `LIMIT`/`OFFSET` clauses with their bind values.
pub(crate) fn push_pagination(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    limit: Option<u32>,
    offset: u32,
) {
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
        if offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(offset)));
        }
    } else if offset > 0 {
        sql.push_str(" LIMIT -1 OFFSET ?");
        bind_values.push(Value::Integer(i64::from(offset)));
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}
