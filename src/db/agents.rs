use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, Row};
use crate::errors::ManagerError;
use crate::models::{Agent, AgentChanges, AgentStatus, NewAgent};
use super::connection::{enum_column, opt_time_column, time_column, to_db_time, write_error};
use super::Database;

const AGENT_COLUMNS: &str =
    "id, owner_id, name, description, status, instance_url, api_key, max_tasks, created_at, updated_at, last_active";

fn agent_from_row(row: &Row) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        status: enum_column(row, 4)?,
        instance_url: row.get(5)?,
        api_key: row.get(6)?,
        max_tasks: row.get(7)?,
        created_at: time_column(row, 8)?,
        updated_at: opt_time_column(row, 9)?,
        last_active: opt_time_column(row, 10)?,
    })
}

/// Filters for agent listings. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AgentFilter {
    pub owner_id: Option<i64>,
    pub status: Option<AgentStatus>,
}

impl Database {
    pub fn create_agent(&self, owner_id: i64, agent: &NewAgent) -> Result<Agent, ManagerError> {
        let id = {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO agents (owner_id, name, description, status, instance_url, api_key, max_tasks, created_at) VALUES (?1, ?2, ?3, 'idle', ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    owner_id,
                    agent.name,
                    agent.description,
                    agent.instance_url,
                    agent.api_key,
                    agent.max_tasks.unwrap_or(5),
                    to_db_time(&Utc::now()),
                ],
            ).map_err(|e| write_error("Failed to create agent", e))?;
            conn.last_insert_rowid()
        };

        self.get_agent(id)?
            .ok_or_else(|| ManagerError::Internal(format!("Agent {} vanished after insert", id)))
    }

    pub fn get_agent(&self, id: i64) -> Result<Option<Agent>, ManagerError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM agents WHERE id = ?1", AGENT_COLUMNS);
        conn.query_row(&sql, rusqlite::params![id], agent_from_row)
            .optional()
            .map_err(|e| ManagerError::StoreUnavailable(format!("Query error: {}", e)))
    }

    pub fn list_agents(&self, filter: &AgentFilter, limit: usize, offset: usize) -> Result<Vec<Agent>, ManagerError> {
        let mut clauses = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        if let Some(owner_id) = filter.owner_id {
            params.push(Value::Integer(owner_id));
            clauses.push(format!("owner_id = ?{}", params.len()));
        }
        if let Some(status) = filter.status {
            params.push(Value::Text(status.as_str().to_string()));
            clauses.push(format!("status = ?{}", params.len()));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        params.push(Value::Integer(limit as i64));
        let limit_idx = params.len();
        params.push(Value::Integer(offset as i64));
        let offset_idx = params.len();

        let sql = format!(
            "SELECT {} FROM agents {} ORDER BY id LIMIT ?{} OFFSET ?{}",
            AGENT_COLUMNS, where_clause, limit_idx, offset_idx
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)
            .map_err(|e| ManagerError::StoreUnavailable(format!("Query failed: {}", e)))?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), agent_from_row)
            .map_err(|e| ManagerError::StoreUnavailable(format!("Query error: {}", e)))?;

        let mut agents = Vec::new();
        for row in rows {
            agents.push(row.map_err(|e| ManagerError::StoreUnavailable(format!("Row error: {}", e)))?);
        }
        Ok(agents)
    }

    pub fn update_agent(&self, id: i64, changes: &AgentChanges) -> Result<Option<Agent>, ManagerError> {
        let affected = {
            let conn = self.lock()?;
            conn.execute(
                "UPDATE agents SET name = COALESCE(?2, name), description = COALESCE(?3, description), instance_url = COALESCE(?4, instance_url), api_key = COALESCE(?5, api_key), max_tasks = COALESCE(?6, max_tasks), updated_at = ?7 WHERE id = ?1",
                rusqlite::params![
                    id,
                    changes.name,
                    changes.description,
                    changes.instance_url,
                    changes.api_key,
                    changes.max_tasks,
                    to_db_time(&Utc::now()),
                ],
            ).map_err(|e| write_error("Failed to update agent", e))?
        };

        if affected == 0 {
            return Ok(None);
        }
        self.get_agent(id)
    }

    /// Writes a new status and refreshes `last_active`. Returns `None` when the
    /// agent does not exist.
    pub fn set_agent_status(
        &self,
        id: i64,
        status: AgentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Agent>, ManagerError> {
        let affected = {
            let conn = self.lock()?;
            let now = to_db_time(&now);
            conn.execute(
                "UPDATE agents SET status = ?2, last_active = ?3, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id, status.as_str(), now],
            ).map_err(|e| ManagerError::StoreUnavailable(format!("Update failed: {}", e)))?
        };

        if affected == 0 {
            return Ok(None);
        }
        self.get_agent(id)
    }

    pub fn delete_agent(&self, id: i64) -> Result<bool, ManagerError> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM agents WHERE id = ?1", rusqlite::params![id])
            .map_err(|e| ManagerError::StoreUnavailable(format!("Delete failed: {}", e)))?;
        Ok(affected > 0)
    }
}
