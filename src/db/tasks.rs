use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row};
use crate::errors::ManagerError;
use crate::models::{NewTask, Task, TaskChanges, TaskStatus, MAX_PRIORITY};
use super::connection::{enum_column, opt_time_column, time_column, to_db_time, write_error};
use super::Database;

const TASK_COLUMNS: &str =
    "id, owner_id, agent_id, title, description, status, priority, progress, created_at, updated_at, started_at, completed_at";

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        agent_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: enum_column(row, 5)?,
        priority: row.get(6)?,
        progress: row.get(7)?,
        created_at: time_column(row, 8)?,
        updated_at: opt_time_column(row, 9)?,
        started_at: opt_time_column(row, 10)?,
        completed_at: opt_time_column(row, 11)?,
    })
}

fn select_task(conn: &Connection, id: i64) -> Result<Option<Task>, ManagerError> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
    conn.query_row(&sql, rusqlite::params![id], task_from_row)
        .optional()
        .map_err(|e| ManagerError::StoreUnavailable(format!("Query error: {}", e)))
}

fn check_priority(priority: Option<i64>) -> Result<(), ManagerError> {
    match priority {
        Some(p) if !(0..=MAX_PRIORITY).contains(&p) => Err(ManagerError::InvalidArgument(
            format!("Priority must be between 0 and {}", MAX_PRIORITY),
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub owner_id: Option<i64>,
    pub status: Option<TaskStatus>,
    pub agent_id: Option<i64>,
}

impl Database {
    pub fn create_task(&self, owner_id: i64, task: &NewTask) -> Result<Task, ManagerError> {
        check_priority(task.priority)?;
        let id = {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO tasks (owner_id, agent_id, title, description, status, priority, progress, created_at) VALUES (?1, ?2, ?3, ?4, 'pending', ?5, 0, ?6)",
                rusqlite::params![
                    owner_id,
                    task.agent_id,
                    task.title,
                    task.description,
                    task.priority.unwrap_or(0),
                    to_db_time(&Utc::now()),
                ],
            ).map_err(|e| write_error("Failed to create task", e))?;
            conn.last_insert_rowid()
        };

        self.get_task(id)?
            .ok_or_else(|| ManagerError::Internal(format!("Task {} vanished after insert", id)))
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>, ManagerError> {
        let conn = self.lock()?;
        select_task(&conn, id)
    }

    pub fn list_tasks(&self, filter: &TaskFilter, limit: usize, offset: usize) -> Result<Vec<Task>, ManagerError> {
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
        if let Some(agent_id) = filter.agent_id {
            params.push(Value::Integer(agent_id));
            clauses.push(format!("agent_id = ?{}", params.len()));
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
            "SELECT {} FROM tasks {} ORDER BY id LIMIT ?{} OFFSET ?{}",
            TASK_COLUMNS, where_clause, limit_idx, offset_idx
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)
            .map_err(|e| ManagerError::StoreUnavailable(format!("Query failed: {}", e)))?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), task_from_row)
            .map_err(|e| ManagerError::StoreUnavailable(format!("Query error: {}", e)))?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row.map_err(|e| ManagerError::StoreUnavailable(format!("Row error: {}", e)))?);
        }
        Ok(tasks)
    }

    pub fn update_task(&self, id: i64, changes: &TaskChanges) -> Result<Option<Task>, ManagerError> {
        check_priority(changes.priority)?;
        let affected = {
            let conn = self.lock()?;
            conn.execute(
                "UPDATE tasks SET title = COALESCE(?2, title), description = COALESCE(?3, description), priority = COALESCE(?4, priority), updated_at = ?5 WHERE id = ?1",
                rusqlite::params![
                    id,
                    changes.title,
                    changes.description,
                    changes.priority,
                    to_db_time(&Utc::now()),
                ],
            ).map_err(|e| write_error("Failed to update task", e))?
        };

        if affected == 0 {
            return Ok(None);
        }
        self.get_task(id)
    }

    /// Read-modify-write of a task's tracked state inside one transaction.
    ///
    /// The closure sees the current row and may change status, progress,
    /// timestamps and the assigned agent; the result is written back and the
    /// stored row is returned. `None` means the task does not exist and nothing
    /// was written.
    pub fn mutate_task<F>(&self, id: i64, mutate: F) -> Result<Option<Task>, ManagerError>
    where
        F: FnOnce(&mut Task) -> Result<(), ManagerError>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()
            .map_err(|e| ManagerError::StoreUnavailable(format!("Failed to begin transaction: {}", e)))?;

        let mut task = match select_task(&tx, id)? {
            Some(task) => task,
            None => return Ok(None),
        };
        mutate(&mut task)?;

        tx.execute(
            "UPDATE tasks SET status = ?2, progress = ?3, agent_id = ?4, started_at = ?5, completed_at = ?6, updated_at = ?7 WHERE id = ?1",
            rusqlite::params![
                id,
                task.status.as_str(),
                task.progress,
                task.agent_id,
                task.started_at.as_ref().map(to_db_time),
                task.completed_at.as_ref().map(to_db_time),
                to_db_time(&Utc::now()),
            ],
        ).map_err(|e| write_error("Failed to update task", e))?;

        let stored = select_task(&tx, id)?;
        tx.commit()
            .map_err(|e| ManagerError::StoreUnavailable(format!("Commit failed: {}", e)))?;
        Ok(stored)
    }

    pub fn delete_task(&self, id: i64) -> Result<bool, ManagerError> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", rusqlite::params![id])
            .map_err(|e| ManagerError::StoreUnavailable(format!("Delete failed: {}", e)))?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::agents::tests::new_agent;
    use crate::db::users::tests::new_user;

    pub(crate) fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            owner_id: None,
            agent_id: None,
            description: None,
            priority: None,
        }
    }

    #[test]
    fn test_db_create_and_get_task() {
        let db = Database::in_memory().unwrap();
        let owner = db.create_user(&new_user("owner"), "hash").unwrap();
        let task = db.create_task(owner.id, &new_task("index docs")).unwrap();

        let loaded = db.get_task(task.id).unwrap().unwrap();
        assert_eq!(loaded.title, "index docs");
        assert_eq!(loaded.status, TaskStatus::Pending);
        assert_eq!(loaded.progress, 0);
        assert!(loaded.started_at.is_none());
        assert!(loaded.completed_at.is_none());
    }

    #[test]
    fn test_db_create_task_rejects_priority() {
        let db = Database::in_memory().unwrap();
        let owner = db.create_user(&new_user("owner"), "hash").unwrap();
        let mut task = new_task("bad");
        task.priority = Some(7);
        assert!(matches!(db.create_task(owner.id, &task), Err(ManagerError::InvalidArgument(_))));
    }

    #[test]
    fn test_db_mutate_task_persists() {
        let db = Database::in_memory().unwrap();
        let owner = db.create_user(&new_user("owner"), "hash").unwrap();
        let task = db.create_task(owner.id, &new_task("t")).unwrap();

        let updated = db.mutate_task(task.id, |t| {
            t.progress = 40;
            t.apply_status(TaskStatus::InProgress, Utc::now());
            Ok(())
        }).unwrap().unwrap();
        assert_eq!(updated.progress, 40);
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert!(updated.started_at.is_some());

        let reloaded = db.get_task(task.id).unwrap().unwrap();
        assert_eq!(reloaded.started_at, updated.started_at);
    }

    #[test]
    fn test_db_mutate_task_missing_and_rejected() {
        let db = Database::in_memory().unwrap();
        assert!(db.mutate_task(404, |_| Ok(())).unwrap().is_none());

        let owner = db.create_user(&new_user("owner"), "hash").unwrap();
        let task = db.create_task(owner.id, &new_task("t")).unwrap();
        let err = db.mutate_task(task.id, |t| {
            t.progress = 99;
            Err(ManagerError::InvalidArgument("nope".into()))
        }).unwrap_err();
        assert!(matches!(err, ManagerError::InvalidArgument(_)));
        assert_eq!(db.get_task(task.id).unwrap().unwrap().progress, 0);
    }

    #[test]
    fn test_db_list_tasks_filters() {
        let db = Database::in_memory().unwrap();
        let owner = db.create_user(&new_user("owner"), "hash").unwrap();
        let agent = db.create_agent(owner.id, &new_agent("a")).unwrap();
        let mut assigned = new_task("assigned");
        assigned.agent_id = Some(agent.id);
        db.create_task(owner.id, &assigned).unwrap();
        let other = db.create_task(owner.id, &new_task("other")).unwrap();
        db.mutate_task(other.id, |t| {
            t.apply_status(TaskStatus::Cancelled, Utc::now());
            Ok(())
        }).unwrap();

        let by_agent = TaskFilter { agent_id: Some(agent.id), ..Default::default() };
        assert_eq!(db.list_tasks(&by_agent, 100, 0).unwrap().len(), 1);

        let cancelled = TaskFilter { status: Some(TaskStatus::Cancelled), ..Default::default() };
        let found = db.list_tasks(&cancelled, 100, 0).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, other.id);

        let owned = TaskFilter { owner_id: Some(owner.id), ..Default::default() };
        assert_eq!(db.list_tasks(&owned, 100, 0).unwrap().len(), 2);
    }

    #[test]
    fn test_db_delete_agent_detaches_tasks() {
        let db = Database::in_memory().unwrap();
        let owner = db.create_user(&new_user("owner"), "hash").unwrap();
        let agent = db.create_agent(owner.id, &new_agent("a")).unwrap();
        let mut assigned = new_task("assigned");
        assigned.agent_id = Some(agent.id);
        let task = db.create_task(owner.id, &assigned).unwrap();

        assert!(db.delete_agent(agent.id).unwrap());
        let reloaded = db.get_task(task.id).unwrap().unwrap();
        assert!(reloaded.agent_id.is_none());
    }

    #[test]
    fn test_db_update_task_descriptive_fields() {
        let db = Database::in_memory().unwrap();
        let owner = db.create_user(&new_user("owner"), "hash").unwrap();
        let task = db.create_task(owner.id, &new_task("t")).unwrap();

        let changes = TaskChanges { title: Some("renamed".into()), priority: Some(3), ..Default::default() };
        let updated = db.update_task(task.id, &changes).unwrap().unwrap();
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.priority, 3);
        assert_eq!(updated.status, TaskStatus::Pending);
        assert!(db.update_task(999, &changes).unwrap().is_none());
    }
}
