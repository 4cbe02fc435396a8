//! Report repository contract and SQLite implementation.
//!
//! Persists the report's own columns only. Guardian links, follow-up
//! back-fill and history aggregation belong to the service layer.
//!
//! # Invariants
//! - List order is `reported_at DESC, uuid ASC`.
//! - Every referenced record must exist; a dangling reference is
//!   `RepoError::InvalidReference`.

use super::{
    ensure_schema_ready, optional_uuid_text, push_pagination, push_search, read_optional_uuid,
    read_uuid, write_error, RepoError, RepoResult,
};
use crate::model::follow_up::ResponseActionId;
use crate::model::report::{Condition, Report, ReportId};
use crate::model::student::{StudentId, TutorId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

pub(crate) const REPORT_COLUMNS_SQL: &str = "
    r.uuid AS uuid,
    r.student_uuid AS student_uuid,
    r.father_uuid AS father_uuid,
    r.mother_uuid AS mother_uuid,
    r.legal_guardian_uuid AS legal_guardian_uuid,
    r.tutor_uuid AS tutor_uuid,
    r.response_action_uuid AS response_action_uuid,
    r.observation_uuid AS observation_uuid,
    r.condition AS condition,
    r.reported_at AS reported_at";

/// Filters for the report list screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportListQuery {
    pub condition: Option<Condition>,
    pub student_uuid: Option<StudentId>,
    pub tutor_uuid: Option<TutorId>,
    pub response_action_uuid: Option<ResponseActionId>,
    /// Substring match on student name, student national ID or condition code.
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

pub trait ReportRepository {
    fn insert_report(&self, report: &Report) -> RepoResult<ReportId>;
    fn update_report(&self, report: &Report) -> RepoResult<()>;
    fn report_exists(&self, id: ReportId) -> RepoResult<bool>;
    fn get_report(&self, id: ReportId) -> RepoResult<Option<Report>>;
    fn list_reports(&self, query: &ReportListQuery) -> RepoResult<Vec<Report>>;
    /// Ids of every report filed for `student`, sorted ascending.
    fn list_report_ids_for_student(&self, student: StudentId) -> RepoResult<Vec<ReportId>>;
    fn delete_report(&self, id: ReportId) -> RepoResult<()>;
}

pub struct SqliteReportRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReportRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ReportRepository for SqliteReportRepository<'_> {
    fn insert_report(&self, report: &Report) -> RepoResult<ReportId> {
        self.conn
            .execute(
                "INSERT INTO reports (
                    uuid,
                    student_uuid,
                    father_uuid,
                    mother_uuid,
                    legal_guardian_uuid,
                    tutor_uuid,
                    response_action_uuid,
                    observation_uuid,
                    condition,
                    reported_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
                params![
                    report.uuid.to_string(),
                    report.student_uuid.to_string(),
                    optional_uuid_text(report.father_uuid),
                    optional_uuid_text(report.mother_uuid),
                    optional_uuid_text(report.legal_guardian_uuid),
                    optional_uuid_text(report.tutor_uuid),
                    optional_uuid_text(report.response_action_uuid),
                    optional_uuid_text(report.observation_uuid),
                    report.condition.code(),
                    report.reported_at,
                ],
            )
            .map_err(|err| write_error("report", err))?;
        Ok(report.uuid)
    }

    fn update_report(&self, report: &Report) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE reports
                 SET
                    student_uuid = ?2,
                    father_uuid = ?3,
                    mother_uuid = ?4,
                    legal_guardian_uuid = ?5,
                    tutor_uuid = ?6,
                    response_action_uuid = ?7,
                    observation_uuid = ?8,
                    condition = ?9,
                    reported_at = ?10,
                    updated_at = (CAST(unixepoch('subsec') * 1000 AS INTEGER))
                 WHERE uuid = ?1;",
                params![
                    report.uuid.to_string(),
                    report.student_uuid.to_string(),
                    optional_uuid_text(report.father_uuid),
                    optional_uuid_text(report.mother_uuid),
                    optional_uuid_text(report.legal_guardian_uuid),
                    optional_uuid_text(report.tutor_uuid),
                    optional_uuid_text(report.response_action_uuid),
                    optional_uuid_text(report.observation_uuid),
                    report.condition.code(),
                    report.reported_at,
                ],
            )
            .map_err(|err| write_error("report", err))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "report",
                id: report.uuid,
            });
        }
        Ok(())
    }

    fn report_exists(&self, id: ReportId) -> RepoResult<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM reports WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn get_report(&self, id: ReportId) -> RepoResult<Option<Report>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REPORT_COLUMNS_SQL} FROM reports r WHERE r.uuid = ?1;"
        ))?;
        stmt.query_row([id.to_string()], |row| Ok(parse_report_row(row)))
            .optional()?
            .transpose()
    }

    fn list_reports(&self, query: &ReportListQuery) -> RepoResult<Vec<Report>> {
        let mut sql = format!(
            "SELECT {REPORT_COLUMNS_SQL}
             FROM reports r
             JOIN students s ON s.uuid = r.student_uuid
             WHERE 1 = 1"
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(condition) = query.condition {
            sql.push_str(" AND r.condition = ?");
            bind_values.push(Value::Text(condition.code().to_string()));
        }
        if let Some(student) = query.student_uuid {
            sql.push_str(" AND r.student_uuid = ?");
            bind_values.push(Value::Text(student.to_string()));
        }
        if let Some(tutor) = query.tutor_uuid {
            sql.push_str(" AND r.tutor_uuid = ?");
            bind_values.push(Value::Text(tutor.to_string()));
        }
        if let Some(action) = query.response_action_uuid {
            sql.push_str(" AND r.response_action_uuid = ?");
            bind_values.push(Value::Text(action.to_string()));
        }
        push_search(
            &mut sql,
            &mut bind_values,
            query.search.as_deref(),
            &["s.name", "IFNULL(s.national_id, '')", "r.condition"],
        );

        sql.push_str(" ORDER BY r.reported_at DESC, r.uuid ASC");
        push_pagination(&mut sql, &mut bind_values, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut reports = Vec::new();
        while let Some(row) = rows.next()? {
            reports.push(parse_report_row(row)?);
        }
        Ok(reports)
    }

    fn list_report_ids_for_student(&self, student: StudentId) -> RepoResult<Vec<ReportId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid FROM reports WHERE student_uuid = ?1 ORDER BY uuid ASC;")?;
        let mut rows = stmt.query([student.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(read_uuid(row, "reports", "uuid")?);
        }
        Ok(ids)
    }

    fn delete_report(&self, id: ReportId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM reports WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "report",
                id,
            });
        }
        Ok(())
    }
}

pub(crate) fn parse_report_row(row: &Row<'_>) -> RepoResult<Report> {
    let condition_code: String = row.get("condition")?;
    let condition = Condition::from_code(&condition_code).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid condition `{condition_code}` in reports.condition"
        ))
    })?;

    Ok(Report {
        uuid: read_uuid(row, "reports", "uuid")?,
        student_uuid: read_uuid(row, "reports", "student_uuid")?,
        father_uuid: read_optional_uuid(row, "reports", "father_uuid")?,
        mother_uuid: read_optional_uuid(row, "reports", "mother_uuid")?,
        legal_guardian_uuid: read_optional_uuid(row, "reports", "legal_guardian_uuid")?,
        tutor_uuid: read_optional_uuid(row, "reports", "tutor_uuid")?,
        response_action_uuid: read_optional_uuid(row, "reports", "response_action_uuid")?,
        observation_uuid: read_optional_uuid(row, "reports", "observation_uuid")?,
        condition,
        reported_at: row.get("reported_at")?,
    })
}
