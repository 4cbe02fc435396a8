//! Guardian repository contract and SQLite implementation.
//!
//! # Responsibility
//! - CRUD for fathers, mothers and legal guardians.
//! - Maintain the guardian↔student link tables.
//!
//! # Invariants
//! - Each [`GuardianKind`] maps to its own record table and link table.
//! - Linking an already-linked student is a no-op.
//! - Deleting a guardian removes its links and nulls report references.

use super::student_repo::parse_student_row;
use super::{
    ensure_schema_ready, push_pagination, push_search, read_uuid, write_error, RepoError,
    RepoResult,
};
use crate::model::guardian::{Guardian, GuardianId, GuardianKind};
use crate::model::student::{Student, StudentId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardianListQuery {
    /// Substring match on name or phone.
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

pub trait GuardianRepository {
    fn create_guardian(&self, guardian: &Guardian) -> RepoResult<GuardianId>;
    fn update_guardian(&self, guardian: &Guardian) -> RepoResult<()>;
    fn get_guardian(&self, kind: GuardianKind, id: GuardianId) -> RepoResult<Option<Guardian>>;
    fn list_guardians(
        &self,
        kind: GuardianKind,
        query: &GuardianListQuery,
    ) -> RepoResult<Vec<Guardian>>;
    fn delete_guardian(&self, kind: GuardianKind, id: GuardianId) -> RepoResult<()>;
    /// Adds `student` to the guardian's student set and touches the guardian.
    ///
    /// Returns `false` when the link already existed.
    fn link_student(
        &self,
        kind: GuardianKind,
        guardian: GuardianId,
        student: StudentId,
    ) -> RepoResult<bool>;
    /// Returns `false` when there was no link to remove.
    fn unlink_student(
        &self,
        kind: GuardianKind,
        guardian: GuardianId,
        student: StudentId,
    ) -> RepoResult<bool>;
    /// Students linked to one guardian, ordered by name.
    fn list_linked_students(
        &self,
        kind: GuardianKind,
        guardian: GuardianId,
    ) -> RepoResult<Vec<Student>>;
    /// Guardians of `kind` linked to one student, ordered by name.
    fn list_guardians_of_student(
        &self,
        kind: GuardianKind,
        student: StudentId,
    ) -> RepoResult<Vec<Guardian>>;
}

pub struct SqliteGuardianRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGuardianRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl GuardianRepository for SqliteGuardianRepository<'_> {
    fn create_guardian(&self, guardian: &Guardian) -> RepoResult<GuardianId> {
        guardian.validate()?;
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {} (uuid, name, phone) VALUES (?1, ?2, ?3);",
                    record_table(guardian.kind)
                ),
                params![
                    guardian.uuid.to_string(),
                    guardian.name.as_str(),
                    guardian.phone.as_deref(),
                ],
            )
            .map_err(|err| write_error(guardian.kind.as_str(), err))?;
        Ok(guardian.uuid)
    }

    fn update_guardian(&self, guardian: &Guardian) -> RepoResult<()> {
        guardian.validate()?;
        let changed = self
            .conn
            .execute(
                &format!(
                    "UPDATE {}
                     SET
                        name = ?2,
                        phone = ?3,
                        updated_at = (CAST(unixepoch('subsec') * 1000 AS INTEGER))
                     WHERE uuid = ?1;",
                    record_table(guardian.kind)
                ),
                params![
                    guardian.uuid.to_string(),
                    guardian.name.as_str(),
                    guardian.phone.as_deref(),
                ],
            )
            .map_err(|err| write_error(guardian.kind.as_str(), err))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: guardian.kind.as_str(),
                id: guardian.uuid,
            });
        }
        Ok(())
    }

    fn get_guardian(&self, kind: GuardianKind, id: GuardianId) -> RepoResult<Option<Guardian>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT uuid, name, phone FROM {} WHERE uuid = ?1;",
            record_table(kind)
        ))?;
        stmt.query_row([id.to_string()], |row| Ok(parse_guardian_row(kind, row)))
            .optional()?
            .transpose()
    }

    fn list_guardians(
        &self,
        kind: GuardianKind,
        query: &GuardianListQuery,
    ) -> RepoResult<Vec<Guardian>> {
        let mut sql = format!(
            "SELECT uuid, name, phone FROM {} WHERE 1 = 1",
            record_table(kind)
        );
        let mut bind_values: Vec<Value> = Vec::new();
        push_search(
            &mut sql,
            &mut bind_values,
            query.search.as_deref(),
            &["name", "IFNULL(phone, '')"],
        );
        sql.push_str(" ORDER BY name ASC, uuid ASC");
        push_pagination(&mut sql, &mut bind_values, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut guardians = Vec::new();
        while let Some(row) = rows.next()? {
            guardians.push(parse_guardian_row(kind, row)?);
        }
        Ok(guardians)
    }

    fn delete_guardian(&self, kind: GuardianKind, id: GuardianId) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE uuid = ?1;", record_table(kind)),
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: kind.as_str(),
                id,
            });
        }
        Ok(())
    }

    fn link_student(
        &self,
        kind: GuardianKind,
        guardian: GuardianId,
        student: StudentId,
    ) -> RepoResult<bool> {
        let inserted = self
            .conn
            .execute(
                &format!(
                    "INSERT OR IGNORE INTO {} (guardian_uuid, student_uuid) VALUES (?1, ?2);",
                    link_table(kind)
                ),
                params![guardian.to_string(), student.to_string()],
            )
            .map_err(|err| write_error(kind.as_str(), err))?;

        let touched = self.conn.execute(
            &format!(
                "UPDATE {} SET updated_at = (CAST(unixepoch('subsec') * 1000 AS INTEGER)) WHERE uuid = ?1;",
                record_table(kind)
            ),
            [guardian.to_string()],
        )?;
        if touched == 0 {
            return Err(RepoError::NotFound {
                entity: kind.as_str(),
                id: guardian,
            });
        }

        Ok(inserted == 1)
    }

    fn unlink_student(
        &self,
        kind: GuardianKind,
        guardian: GuardianId,
        student: StudentId,
    ) -> RepoResult<bool> {
        let removed = self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE guardian_uuid = ?1 AND student_uuid = ?2;",
                link_table(kind)
            ),
            params![guardian.to_string(), student.to_string()],
        )?;
        Ok(removed == 1)
    }

    fn list_linked_students(
        &self,
        kind: GuardianKind,
        guardian: GuardianId,
    ) -> RepoResult<Vec<Student>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                s.uuid AS uuid,
                s.name AS name,
                s.national_id AS national_id,
                s.grade AS grade,
                s.section AS section,
                s.section_label AS section_label
             FROM students s
             JOIN {} l ON l.student_uuid = s.uuid
             WHERE l.guardian_uuid = ?1
             ORDER BY s.name ASC, s.uuid ASC;",
            link_table(kind)
        ))?;
        let mut rows = stmt.query([guardian.to_string()])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }

    fn list_guardians_of_student(
        &self,
        kind: GuardianKind,
        student: StudentId,
    ) -> RepoResult<Vec<Guardian>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT g.uuid AS uuid, g.name AS name, g.phone AS phone
             FROM {} g
             JOIN {} l ON l.guardian_uuid = g.uuid
             WHERE l.student_uuid = ?1
             ORDER BY g.name ASC, g.uuid ASC;",
            record_table(kind),
            link_table(kind)
        ))?;
        let mut rows = stmt.query([student.to_string()])?;
        let mut guardians = Vec::new();
        while let Some(row) = rows.next()? {
            guardians.push(parse_guardian_row(kind, row)?);
        }
        Ok(guardians)
    }
}

fn record_table(kind: GuardianKind) -> &'static str {
    match kind {
        GuardianKind::Father => "fathers",
        GuardianKind::Mother => "mothers",
        GuardianKind::LegalGuardian => "legal_guardians",
    }
}

fn link_table(kind: GuardianKind) -> &'static str {
    match kind {
        GuardianKind::Father => "father_students",
        GuardianKind::Mother => "mother_students",
        GuardianKind::LegalGuardian => "legal_guardian_students",
    }
}

fn parse_guardian_row(kind: GuardianKind, row: &Row<'_>) -> RepoResult<Guardian> {
    Ok(Guardian {
        uuid: read_uuid(row, record_table(kind), "uuid")?,
        kind,
        name: row.get("name")?,
        phone: row.get("phone")?,
    })
}
