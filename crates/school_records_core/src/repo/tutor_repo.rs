//! Tutor repository contract and SQLite implementation.
//!
//! Deleting a tutor nulls `reports.tutor_uuid`; reports survive.

use super::{
    ensure_schema_ready, push_pagination, push_search, read_uuid, write_error, RepoError,
    RepoResult,
};
use crate::model::student::{Tutor, TutorId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const TUTOR_SELECT_SQL: &str = "SELECT uuid, name, surname, grade, section FROM tutors";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TutorListQuery {
    /// Substring match on name, surname, grade or section.
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

pub trait TutorRepository {
    fn create_tutor(&self, tutor: &Tutor) -> RepoResult<TutorId>;
    fn update_tutor(&self, tutor: &Tutor) -> RepoResult<()>;
    fn get_tutor(&self, id: TutorId) -> RepoResult<Option<Tutor>>;
    fn list_tutors(&self, query: &TutorListQuery) -> RepoResult<Vec<Tutor>>;
    fn delete_tutor(&self, id: TutorId) -> RepoResult<()>;
}

pub struct SqliteTutorRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTutorRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TutorRepository for SqliteTutorRepository<'_> {
    fn create_tutor(&self, tutor: &Tutor) -> RepoResult<TutorId> {
        tutor.validate()?;
        self.conn
            .execute(
                "INSERT INTO tutors (uuid, name, surname, grade, section)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    tutor.uuid.to_string(),
                    tutor.name.as_str(),
                    tutor.surname.as_str(),
                    tutor.grade.as_str(),
                    tutor.section.as_str(),
                ],
            )
            .map_err(|err| write_error("tutor", err))?;
        Ok(tutor.uuid)
    }

    fn update_tutor(&self, tutor: &Tutor) -> RepoResult<()> {
        tutor.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE tutors
                 SET
                    name = ?2,
                    surname = ?3,
                    grade = ?4,
                    section = ?5,
                    updated_at = (CAST(unixepoch('subsec') * 1000 AS INTEGER))
                 WHERE uuid = ?1;",
                params![
                    tutor.uuid.to_string(),
                    tutor.name.as_str(),
                    tutor.surname.as_str(),
                    tutor.grade.as_str(),
                    tutor.section.as_str(),
                ],
            )
            .map_err(|err| write_error("tutor", err))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "tutor",
                id: tutor.uuid,
            });
        }
        Ok(())
    }

    fn get_tutor(&self, id: TutorId) -> RepoResult<Option<Tutor>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TUTOR_SELECT_SQL} WHERE uuid = ?1;"))?;
        stmt.query_row([id.to_string()], |row| Ok(parse_tutor_row(row)))
            .optional()?
            .transpose()
    }

    fn list_tutors(&self, query: &TutorListQuery) -> RepoResult<Vec<Tutor>> {
        let mut sql = format!("{TUTOR_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        push_search(
            &mut sql,
            &mut bind_values,
            query.search.as_deref(),
            &["name", "surname", "grade", "section"],
        );
        sql.push_str(" ORDER BY surname ASC, name ASC, uuid ASC");
        push_pagination(&mut sql, &mut bind_values, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tutors = Vec::new();
        while let Some(row) = rows.next()? {
            tutors.push(parse_tutor_row(row)?);
        }
        Ok(tutors)
    }

    fn delete_tutor(&self, id: TutorId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tutors WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "tutor", id });
        }
        Ok(())
    }
}

fn parse_tutor_row(row: &Row<'_>) -> RepoResult<Tutor> {
    Ok(Tutor {
        uuid: read_uuid(row, "tutors", "uuid")?,
        name: row.get("name")?,
        surname: row.get("surname")?,
        grade: row.get("grade")?,
        section: row.get("section")?,
    })
}
