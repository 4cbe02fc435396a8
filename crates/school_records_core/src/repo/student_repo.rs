//! Student repository contract and SQLite implementation.
//!
//! # Invariants
//! - Deleting a student cascades to its reports, history, guardian links,
//!   attendance justifications and the follow-ups that point at it.
//! - Listing is ordered by `grade, section, name, uuid`.

use super::{
    ensure_schema_ready, push_pagination, push_search, read_uuid, write_error, RepoError,
    RepoResult,
};
use crate::model::student::{Student, StudentId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const STUDENT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    national_id,
    grade,
    section,
    section_label
FROM students";

/// Filters for the student list screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentListQuery {
    pub grade: Option<String>,
    pub section: Option<String>,
    /// Substring match on name, national ID, grade or section.
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

pub trait StudentRepository {
    fn create_student(&self, student: &Student) -> RepoResult<StudentId>;
    fn update_student(&self, student: &Student) -> RepoResult<()>;
    fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>>;
    fn list_students(&self, query: &StudentListQuery) -> RepoResult<Vec<Student>>;
    fn delete_student(&self, id: StudentId) -> RepoResult<()>;
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn create_student(&self, student: &Student) -> RepoResult<StudentId> {
        student.validate()?;
        self.conn
            .execute(
                "INSERT INTO students (uuid, name, national_id, grade, section, section_label)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    student.uuid.to_string(),
                    student.name.as_str(),
                    student.national_id.as_deref(),
                    student.grade.as_str(),
                    student.section.as_str(),
                    student.section_label.as_str(),
                ],
            )
            .map_err(|err| write_error("student", err))?;
        Ok(student.uuid)
    }

    fn update_student(&self, student: &Student) -> RepoResult<()> {
        student.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE students
                 SET
                    name = ?2,
                    national_id = ?3,
                    grade = ?4,
                    section = ?5,
                    section_label = ?6,
                    updated_at = (CAST(unixepoch('subsec') * 1000 AS INTEGER))
                 WHERE uuid = ?1;",
                params![
                    student.uuid.to_string(),
                    student.name.as_str(),
                    student.national_id.as_deref(),
                    student.grade.as_str(),
                    student.section.as_str(),
                    student.section_label.as_str(),
                ],
            )
            .map_err(|err| write_error("student", err))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "student",
                id: student.uuid,
            });
        }
        Ok(())
    }

    fn get_student(&self, id: StudentId) -> RepoResult<Option<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let student = stmt
            .query_row([id.to_string()], |row| Ok(parse_student_row(row)))
            .optional()?;
        student.transpose()
    }

    fn list_students(&self, query: &StudentListQuery) -> RepoResult<Vec<Student>> {
        let mut sql = format!("{STUDENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(grade) = query.grade.as_deref() {
            sql.push_str(" AND grade = ?");
            bind_values.push(Value::Text(grade.to_string()));
        }
        if let Some(section) = query.section.as_deref() {
            sql.push_str(" AND section = ?");
            bind_values.push(Value::Text(section.to_string()));
        }
        push_search(
            &mut sql,
            &mut bind_values,
            query.search.as_deref(),
            &["name", "IFNULL(national_id, '')", "grade", "section"],
        );

        sql.push_str(" ORDER BY grade ASC, section ASC, name ASC, uuid ASC");
        push_pagination(&mut sql, &mut bind_values, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }

    fn delete_student(&self, id: StudentId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM students WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "student",
                id,
            });
        }
        Ok(())
    }
}

pub(crate) fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    Ok(Student {
        uuid: read_uuid(row, "students", "uuid")?,
        name: row.get("name")?,
        national_id: row.get("national_id")?,
        grade: row.get("grade")?,
        section: row.get("section")?,
        section_label: row.get("section_label")?,
    })
}
