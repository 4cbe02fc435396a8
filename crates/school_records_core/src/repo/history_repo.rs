//! History repository contract and SQLite implementation.
//!
//! # Invariants
//! - At most one history row per student (`histories.student_uuid UNIQUE`).
//! - `report_count` always stores the exact size of the history's report
//!   set: `refresh_count` recomputes it after inserts, and a trigger on
//!   `history_reports` recomputes it after any removal, cascades included.

use super::report_repo::{parse_report_row, REPORT_COLUMNS_SQL};
use super::{
    ensure_schema_ready, parse_uuid, push_pagination, push_search, read_uuid, write_error,
    RepoError, RepoResult,
};
use crate::model::history::{History, HistoryId};
use crate::model::report::{Report, ReportId};
use crate::model::student::StudentId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

/// Filters for the history list screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryListQuery {
    pub grade: Option<String>,
    pub section: Option<String>,
    /// Substring match on student name or any held report's condition code.
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

pub trait HistoryRepository {
    /// Returns the student's history, creating an empty one if missing.
    fn get_or_create_history(&self, student: StudentId) -> RepoResult<History>;
    fn get_history_for_student(&self, student: StudentId) -> RepoResult<Option<History>>;
    /// Set-union insert. Returns `false` when the report was already held.
    fn add_report(&self, history: HistoryId, report: ReportId) -> RepoResult<bool>;
    /// Replaces the whole report set.
    fn replace_reports(&self, history: HistoryId, reports: &[ReportId]) -> RepoResult<()>;
    /// Recomputes and stores the cached count, touching `updated_at`.
    fn refresh_count(&self, history: HistoryId) -> RepoResult<u32>;
    /// Histories whose report set contains `report`.
    fn histories_containing(&self, report: ReportId) -> RepoResult<Vec<HistoryId>>;
    fn list_histories(&self, query: &HistoryListQuery) -> RepoResult<Vec<History>>;
    /// Reports held by one history, newest first.
    fn list_history_reports(&self, history: HistoryId) -> RepoResult<Vec<Report>>;
}

pub struct SqliteHistoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHistoryRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_report_ids(&self, history: HistoryId) -> RepoResult<Vec<ReportId>> {
        let mut stmt = self.conn.prepare(
            "SELECT report_uuid FROM history_reports WHERE history_uuid = ?1 ORDER BY report_uuid ASC;",
        )?;
        let mut rows = stmt.query([history.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(read_uuid(row, "history_reports", "report_uuid")?);
        }
        Ok(ids)
    }

    fn load_history(&self, where_sql: &str, key: String) -> RepoResult<Option<History>> {
        let header = self
            .conn
            .query_row(
                &format!(
                    "SELECT uuid, student_uuid, report_count, updated_at FROM histories WHERE {where_sql};"
                ),
                [key],
                |row| {
                    Ok((
                        row.get::<_, String>("uuid")?,
                        row.get::<_, String>("student_uuid")?,
                        row.get::<_, i64>("report_count")?,
                        row.get::<_, i64>("updated_at")?,
                    ))
                },
            )
            .optional()?;

        let Some((uuid_text, student_text, report_count, updated_at)) = header else {
            return Ok(None);
        };
        let uuid = parse_uuid(&uuid_text, "histories", "uuid")?;
        let student_uuid = parse_uuid(&student_text, "histories", "student_uuid")?;
        let report_count = u32::try_from(report_count).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid report_count `{report_count}` in histories.report_count"
            ))
        })?;

        Ok(Some(History {
            uuid,
            student_uuid,
            report_count,
            report_uuids: self.load_report_ids(uuid)?,
            updated_at,
        }))
    }
}

impl HistoryRepository for SqliteHistoryRepository<'_> {
    fn get_or_create_history(&self, student: StudentId) -> RepoResult<History> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO histories (uuid, student_uuid) VALUES (?1, ?2);",
                params![Uuid::new_v4().to_string(), student.to_string()],
            )
            .map_err(|err| write_error("history", err))?;
        self.get_history_for_student(student)?.ok_or_else(|| {
            RepoError::InvalidData(format!("history for student {student} missing after insert"))
        })
    }

    fn get_history_for_student(&self, student: StudentId) -> RepoResult<Option<History>> {
        self.load_history("student_uuid = ?1", student.to_string())
    }

    fn add_report(&self, history: HistoryId, report: ReportId) -> RepoResult<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO history_reports (history_uuid, report_uuid) VALUES (?1, ?2);",
                params![history.to_string(), report.to_string()],
            )
            .map_err(|err| write_error("history", err))?;
        Ok(inserted == 1)
    }

    fn replace_reports(&self, history: HistoryId, reports: &[ReportId]) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM history_reports WHERE history_uuid = ?1;",
            [history.to_string()],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO history_reports (history_uuid, report_uuid) VALUES (?1, ?2);",
        )?;
        for report in reports {
            stmt.execute(params![history.to_string(), report.to_string()])
                .map_err(|err| write_error("history", err))?;
        }
        Ok(())
    }

    fn refresh_count(&self, history: HistoryId) -> RepoResult<u32> {
        let changed = self.conn.execute(
            "UPDATE histories
             SET
                report_count = (
                    SELECT COUNT(*) FROM history_reports WHERE history_uuid = ?1
                ),
                updated_at = (CAST(unixepoch('subsec') * 1000 AS INTEGER))
             WHERE uuid = ?1;",
            [history.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "history",
                id: history,
            });
        }
        let count: u32 = self.conn.query_row(
            "SELECT report_count FROM histories WHERE uuid = ?1;",
            [history.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn histories_containing(&self, report: ReportId) -> RepoResult<Vec<HistoryId>> {
        let mut stmt = self.conn.prepare(
            "SELECT history_uuid FROM history_reports WHERE report_uuid = ?1 ORDER BY history_uuid ASC;",
        )?;
        let mut rows = stmt.query([report.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(read_uuid(row, "history_reports", "history_uuid")?);
        }
        Ok(ids)
    }

    fn list_histories(&self, query: &HistoryListQuery) -> RepoResult<Vec<History>> {
        let mut sql = "SELECT h.student_uuid AS student_uuid
             FROM histories h
             JOIN students s ON s.uuid = h.student_uuid
             WHERE 1 = 1"
            .to_string();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(grade) = query.grade.as_deref() {
            sql.push_str(" AND s.grade = ?");
            bind_values.push(Value::Text(grade.to_string()));
        }
        if let Some(section) = query.section.as_deref() {
            sql.push_str(" AND s.section = ?");
            bind_values.push(Value::Text(section.to_string()));
        }
        push_search(
            &mut sql,
            &mut bind_values,
            query.search.as_deref(),
            &[
                "s.name",
                "IFNULL((SELECT group_concat(r.condition, ' ')
                    FROM history_reports hr
                    JOIN reports r ON r.uuid = hr.report_uuid
                    WHERE hr.history_uuid = h.uuid), '')",
            ],
        );
        sql.push_str(" ORDER BY s.name ASC, h.uuid ASC");
        push_pagination(&mut sql, &mut bind_values, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(read_uuid(row, "histories", "student_uuid")?);
        }
        drop(rows);

        let mut histories = Vec::with_capacity(students.len());
        for student in students {
            if let Some(history) = self.get_history_for_student(student)? {
                histories.push(history);
            }
        }
        Ok(histories)
    }

    fn list_history_reports(&self, history: HistoryId) -> RepoResult<Vec<Report>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REPORT_COLUMNS_SQL}
             FROM reports r
             JOIN history_reports hr ON hr.report_uuid = r.uuid
             WHERE hr.history_uuid = ?1
             ORDER BY r.reported_at DESC, r.uuid ASC;"
        ))?;
        let mut rows = stmt.query([history.to_string()])?;
        let mut reports = Vec::new();
        while let Some(row) = rows.next()? {
            reports.push(parse_report_row(row)?);
        }
        Ok(reports)
    }
}
