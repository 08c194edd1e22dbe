use chrono::Utc;
use rusqlite::Row;
use crate::errors::ManagerError;
use crate::models::{AgentLog, LogLevel, TaskLog};
use super::connection::{enum_column, time_column, to_db_time};
use super::Database;

fn agent_log_from_row(row: &Row) -> rusqlite::Result<AgentLog> {
    Ok(AgentLog {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        timestamp: time_column(row, 2)?,
        level: enum_column(row, 3)?,
        message: row.get(4)?,
    })
}

fn task_log_from_row(row: &Row) -> rusqlite::Result<TaskLog> {
    Ok(TaskLog {
        id: row.get(0)?,
        task_id: row.get(1)?,
        timestamp: time_column(row, 2)?,
        level: enum_column(row, 3)?,
        message: row.get(4)?,
    })
}

impl Database {
    pub fn append_agent_log(&self, agent_id: i64, level: LogLevel, message: &str) -> Result<AgentLog, ManagerError> {
        let conn = self.lock()?;
        let timestamp = to_db_time(&Utc::now());
        conn.execute(
            "INSERT INTO agent_logs (agent_id, timestamp, level, message) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![agent_id, timestamp, level.as_str(), message],
        ).map_err(|e| ManagerError::StoreUnavailable(format!("Failed to append agent log: {}", e)))?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, agent_id, timestamp, level, message FROM agent_logs WHERE id = ?1",
            rusqlite::params![id],
            agent_log_from_row,
        ).map_err(|e| ManagerError::StoreUnavailable(format!("Query error: {}", e)))
    }

    pub fn append_task_log(&self, task_id: i64, level: LogLevel, message: &str) -> Result<TaskLog, ManagerError> {
        let conn = self.lock()?;
        let timestamp = to_db_time(&Utc::now());
        conn.execute(
            "INSERT INTO task_logs (task_id, timestamp, level, message) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![task_id, timestamp, level.as_str(), message],
        ).map_err(|e| ManagerError::StoreUnavailable(format!("Failed to append task log: {}", e)))?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, task_id, timestamp, level, message FROM task_logs WHERE id = ?1",
            rusqlite::params![id],
            task_log_from_row,
        ).map_err(|e| ManagerError::StoreUnavailable(format!("Query error: {}", e)))
    }

    /// Most recent entries first.
    pub fn agent_logs(&self, agent_id: i64, limit: usize) -> Result<Vec<AgentLog>, ManagerError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, agent_id, timestamp, level, message FROM agent_logs WHERE agent_id = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2"
        ).map_err(|e| ManagerError::StoreUnavailable(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(rusqlite::params![agent_id, limit as i64], agent_log_from_row)
            .map_err(|e| ManagerError::StoreUnavailable(format!("Query error: {}", e)))?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row.map_err(|e| ManagerError::StoreUnavailable(format!("Row error: {}", e)))?);
        }
        Ok(logs)
    }

    /// Most recent entries first.
    pub fn task_logs(&self, task_id: i64, limit: usize) -> Result<Vec<TaskLog>, ManagerError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, task_id, timestamp, level, message FROM task_logs WHERE task_id = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2"
        ).map_err(|e| ManagerError::StoreUnavailable(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(rusqlite::params![task_id, limit as i64], task_log_from_row)
            .map_err(|e| ManagerError::StoreUnavailable(format!("Query error: {}", e)))?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row.map_err(|e| ManagerError::StoreUnavailable(format!("Row error: {}", e)))?);
        }
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::agents::tests::new_agent;
    use crate::db::tasks::tests::new_task;
    use crate::db::users::tests::new_user;

    #[test]
    fn test_db_agent_logs_newest_first_with_limit() {
        let db = Database::in_memory().unwrap();
        let owner = db.create_user(&new_user("owner"), "hash").unwrap();
        let agent = db.create_agent(owner.id, &new_agent("a")).unwrap();
        for i in 0..5 {
            db.append_agent_log(agent.id, LogLevel::Info, &format!("entry {}", i)).unwrap();
        }

        let logs = db.agent_logs(agent.id, 3).unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].message, "entry 4");
        assert_eq!(logs[1].message, "entry 3");
        assert_eq!(logs[2].message, "entry 2");
    }

    #[test]
    fn test_db_task_log_levels_roundtrip() {
        let db = Database::in_memory().unwrap();
        let owner = db.create_user(&new_user("owner"), "hash").unwrap();
        let task = db.create_task(owner.id, &new_task("t")).unwrap();

        let written = db.append_task_log(task.id, LogLevel::Warning, "slow").unwrap();
        assert_eq!(written.task_id, task.id);
        assert_eq!(written.level, LogLevel::Warning);

        let logs = db.task_logs(task.id, 100).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "slow");
    }

    #[test]
    fn test_db_logs_cascade_with_parent() {
        let db = Database::in_memory().unwrap();
        let owner = db.create_user(&new_user("owner"), "hash").unwrap();
        let agent = db.create_agent(owner.id, &new_agent("a")).unwrap();
        let task = db.create_task(owner.id, &new_task("t")).unwrap();
        db.append_agent_log(agent.id, LogLevel::Info, "hello").unwrap();
        db.append_task_log(task.id, LogLevel::Info, "hello").unwrap();

        db.delete_agent(agent.id).unwrap();
        db.delete_task(task.id).unwrap();
        assert!(db.agent_logs(agent.id, 10).unwrap().is_empty());
        assert!(db.task_logs(task.id, 10).unwrap().is_empty());
    }

    #[test]
    fn test_db_append_log_for_missing_parent_fails() {
        let db = Database::in_memory().unwrap();
        assert!(db.append_agent_log(77, LogLevel::Info, "nobody").is_err());
    }
}
