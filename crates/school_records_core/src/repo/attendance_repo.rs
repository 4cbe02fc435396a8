//! Attendance justification repository.

use super::{ensure_schema_ready, read_uuid, write_error, RepoError, RepoResult};
use crate::model::attendance::{AttendanceJustification, JustificationId};
use crate::model::student::StudentId;
use rusqlite::{params, Connection, Row};

pub trait AttendanceRepository {
    fn create_justification(
        &self,
        justification: &AttendanceJustification,
    ) -> RepoResult<JustificationId>;
    /// Newest absence first.
    fn list_justifications_for_student(
        &self,
        student: StudentId,
    ) -> RepoResult<Vec<AttendanceJustification>>;
    fn delete_justification(&self, id: JustificationId) -> RepoResult<()>;
}

pub struct SqliteAttendanceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttendanceRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AttendanceRepository for SqliteAttendanceRepository<'_> {
    fn create_justification(
        &self,
        justification: &AttendanceJustification,
    ) -> RepoResult<JustificationId> {
        justification.validate()?;
        self.conn
            .execute(
                "INSERT INTO attendance_justifications (uuid, student_uuid, justified_at, description)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    justification.uuid.to_string(),
                    justification.student_uuid.to_string(),
                    justification.justified_at,
                    justification.description.as_str(),
                ],
            )
            .map_err(|err| write_error("attendance_justification", err))?;
        Ok(justification.uuid)
    }

    fn list_justifications_for_student(
        &self,
        student: StudentId,
    ) -> RepoResult<Vec<AttendanceJustification>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, student_uuid, justified_at, description
             FROM attendance_justifications
             WHERE student_uuid = ?1
             ORDER BY justified_at DESC, uuid ASC;",
        )?;
        let mut rows = stmt.query([student.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_justification_row(row)?);
        }
        Ok(items)
    }

    fn delete_justification(&self, id: JustificationId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM attendance_justifications WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "attendance_justification",
                id,
            });
        }
        Ok(())
    }
}

fn parse_justification_row(row: &Row<'_>) -> RepoResult<AttendanceJustification> {
    Ok(AttendanceJustification {
        uuid: read_uuid(row, "attendance_justifications", "uuid")?,
        student_uuid: read_uuid(row, "attendance_justifications", "student_uuid")?,
        justified_at: row.get("justified_at")?,
        description: row.get("description")?,
    })
}
