//! Observation and response-action repository.
//!
//! # Invariants
//! - `claim_*_student` only writes when the student reference is unset, in
//!   a single conditional `UPDATE`, so the first claimant wins.
//! - Deleting an observation deletes the reports that reference it;
//!   deleting a response action nulls `reports.response_action_uuid`.

use super::{
    ensure_schema_ready, optional_uuid_text, push_pagination, push_search, read_optional_uuid,
    read_uuid, write_error, RepoError, RepoResult,
};
use crate::model::follow_up::{Observation, ObservationId, ResponseAction, ResponseActionId};
use crate::model::student::StudentId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

const OBSERVATION_SELECT_SQL: &str = "SELECT
    o.uuid AS uuid,
    o.student_uuid AS student_uuid,
    o.description AS description,
    o.created_at AS created_at
FROM observations o
LEFT JOIN students s ON s.uuid = o.student_uuid";

const RESPONSE_ACTION_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    student_uuid,
    created_at
FROM response_actions";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationListQuery {
    pub student_uuid: Option<StudentId>,
    /// Substring match on description or student name.
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseActionListQuery {
    pub student_uuid: Option<StudentId>,
    /// Substring match on the action name.
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

pub trait FollowUpRepository {
    fn create_observation(&self, observation: &Observation) -> RepoResult<ObservationId>;
    fn update_observation(&self, observation: &Observation) -> RepoResult<()>;
    fn get_observation(&self, id: ObservationId) -> RepoResult<Option<Observation>>;
    fn list_observations(&self, query: &ObservationListQuery) -> RepoResult<Vec<Observation>>;
    fn delete_observation(&self, id: ObservationId) -> RepoResult<()>;
    /// Sets the observation's student if unset. Returns whether it wrote.
    fn claim_observation_student(
        &self,
        id: ObservationId,
        student: StudentId,
    ) -> RepoResult<bool>;

    fn create_response_action(&self, action: &ResponseAction) -> RepoResult<ResponseActionId>;
    fn update_response_action(&self, action: &ResponseAction) -> RepoResult<()>;
    fn get_response_action(&self, id: ResponseActionId) -> RepoResult<Option<ResponseAction>>;
    fn list_response_actions(
        &self,
        query: &ResponseActionListQuery,
    ) -> RepoResult<Vec<ResponseAction>>;
    fn delete_response_action(&self, id: ResponseActionId) -> RepoResult<()>;
    /// Sets the action's student if unset. Returns whether it wrote.
    fn claim_response_action_student(
        &self,
        id: ResponseActionId,
        student: StudentId,
    ) -> RepoResult<bool>;
}

pub struct SqliteFollowUpRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFollowUpRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn claim_student(
        &self,
        table: &'static str,
        entity: &'static str,
        id: Uuid,
        student: StudentId,
    ) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute(
                &format!(
                    "UPDATE {table}
                     SET
                        student_uuid = ?2,
                        updated_at = (CAST(unixepoch('subsec') * 1000 AS INTEGER))
                     WHERE uuid = ?1
                       AND student_uuid IS NULL;"
                ),
                params![id.to_string(), student.to_string()],
            )
            .map_err(|err| write_error(entity, err))?;
        if changed == 1 {
            return Ok(true);
        }

        let exists: bool = self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE uuid = ?1);"),
            [id.to_string()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(RepoError::NotFound { entity, id });
        }
        Ok(false)
    }

    fn delete_row(&self, table: &'static str, entity: &'static str, id: Uuid) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {table} WHERE uuid = ?1;"),
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity, id });
        }
        Ok(())
    }
}

impl FollowUpRepository for SqliteFollowUpRepository<'_> {
    fn create_observation(&self, observation: &Observation) -> RepoResult<ObservationId> {
        observation.validate()?;
        self.conn
            .execute(
                "INSERT INTO observations (uuid, student_uuid, description, created_at)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    observation.uuid.to_string(),
                    optional_uuid_text(observation.student_uuid),
                    observation.description.as_str(),
                    observation.created_at,
                ],
            )
            .map_err(|err| write_error("observation", err))?;
        Ok(observation.uuid)
    }

    fn update_observation(&self, observation: &Observation) -> RepoResult<()> {
        observation.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE observations
                 SET
                    student_uuid = ?2,
                    description = ?3,
                    updated_at = (CAST(unixepoch('subsec') * 1000 AS INTEGER))
                 WHERE uuid = ?1;",
                params![
                    observation.uuid.to_string(),
                    optional_uuid_text(observation.student_uuid),
                    observation.description.as_str(),
                ],
            )
            .map_err(|err| write_error("observation", err))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "observation",
                id: observation.uuid,
            });
        }
        Ok(())
    }

    fn get_observation(&self, id: ObservationId) -> RepoResult<Option<Observation>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{OBSERVATION_SELECT_SQL} WHERE o.uuid = ?1;"))?;
        stmt.query_row([id.to_string()], |row| Ok(parse_observation_row(row)))
            .optional()?
            .transpose()
    }

    fn list_observations(&self, query: &ObservationListQuery) -> RepoResult<Vec<Observation>> {
        let mut sql = format!("{OBSERVATION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(student) = query.student_uuid {
            sql.push_str(" AND o.student_uuid = ?");
            bind_values.push(Value::Text(student.to_string()));
        }
        push_search(
            &mut sql,
            &mut bind_values,
            query.search.as_deref(),
            &["o.description", "IFNULL(s.name, '')"],
        );
        sql.push_str(" ORDER BY o.created_at DESC, o.uuid ASC");
        push_pagination(&mut sql, &mut bind_values, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut observations = Vec::new();
        while let Some(row) = rows.next()? {
            observations.push(parse_observation_row(row)?);
        }
        Ok(observations)
    }

    fn delete_observation(&self, id: ObservationId) -> RepoResult<()> {
        self.delete_row("observations", "observation", id)
    }

    fn claim_observation_student(
        &self,
        id: ObservationId,
        student: StudentId,
    ) -> RepoResult<bool> {
        self.claim_student("observations", "observation", id, student)
    }

    fn create_response_action(&self, action: &ResponseAction) -> RepoResult<ResponseActionId> {
        action.validate()?;
        self.conn
            .execute(
                "INSERT INTO response_actions (uuid, name, student_uuid, created_at)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    action.uuid.to_string(),
                    action.name.as_str(),
                    optional_uuid_text(action.student_uuid),
                    action.created_at,
                ],
            )
            .map_err(|err| write_error("response_action", err))?;
        Ok(action.uuid)
    }

    fn update_response_action(&self, action: &ResponseAction) -> RepoResult<()> {
        action.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE response_actions
                 SET
                    name = ?2,
                    student_uuid = ?3,
                    updated_at = (CAST(unixepoch('subsec') * 1000 AS INTEGER))
                 WHERE uuid = ?1;",
                params![
                    action.uuid.to_string(),
                    action.name.as_str(),
                    optional_uuid_text(action.student_uuid),
                ],
            )
            .map_err(|err| write_error("response_action", err))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "response_action",
                id: action.uuid,
            });
        }
        Ok(())
    }

    fn get_response_action(&self, id: ResponseActionId) -> RepoResult<Option<ResponseAction>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RESPONSE_ACTION_SELECT_SQL} WHERE uuid = ?1;"))?;
        stmt.query_row([id.to_string()], |row| Ok(parse_response_action_row(row)))
            .optional()?
            .transpose()
    }

    fn list_response_actions(
        &self,
        query: &ResponseActionListQuery,
    ) -> RepoResult<Vec<ResponseAction>> {
        let mut sql = format!("{RESPONSE_ACTION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(student) = query.student_uuid {
            sql.push_str(" AND student_uuid = ?");
            bind_values.push(Value::Text(student.to_string()));
        }
        push_search(&mut sql, &mut bind_values, query.search.as_deref(), &["name"]);
        sql.push_str(" ORDER BY name ASC, uuid ASC");
        push_pagination(&mut sql, &mut bind_values, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut actions = Vec::new();
        while let Some(row) = rows.next()? {
            actions.push(parse_response_action_row(row)?);
        }
        Ok(actions)
    }

    fn delete_response_action(&self, id: ResponseActionId) -> RepoResult<()> {
        self.delete_row("response_actions", "response_action", id)
    }

    fn claim_response_action_student(
        &self,
        id: ResponseActionId,
        student: StudentId,
    ) -> RepoResult<bool> {
        self.claim_student("response_actions", "response_action", id, student)
    }
}

fn parse_observation_row(row: &Row<'_>) -> RepoResult<Observation> {
    Ok(Observation {
        uuid: read_uuid(row, "observations", "uuid")?,
        student_uuid: read_optional_uuid(row, "observations", "student_uuid")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_response_action_row(row: &Row<'_>) -> RepoResult<ResponseAction> {
    Ok(ResponseAction {
        uuid: read_uuid(row, "response_actions", "uuid")?,
        name: row.get("name")?,
        student_uuid: read_optional_uuid(row, "response_actions", "student_uuid")?,
        created_at: row.get("created_at")?,
    })
}
