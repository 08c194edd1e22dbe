use chrono::Utc;
use rusqlite::{OptionalExtension, Row};
use crate::errors::ManagerError;
use crate::models::{NewUser, User, UserChanges};
use super::connection::{opt_time_column, time_column, to_db_time, write_error};
use super::Database;

const USER_COLUMNS: &str =
    "id, username, email, hashed_password, is_active, is_superuser, full_name, created_at, updated_at";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        hashed_password: row.get(3)?,
        is_active: row.get(4)?,
        is_superuser: row.get(5)?,
        full_name: row.get(6)?,
        created_at: time_column(row, 7)?,
        updated_at: opt_time_column(row, 8)?,
    })
}

impl Database {
    pub fn create_user(&self, user: &NewUser, hashed_password: &str) -> Result<User, ManagerError> {
        let id = {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO users (username, email, hashed_password, is_active, is_superuser, full_name, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    user.username,
                    user.email,
                    hashed_password,
                    user.is_active,
                    user.is_superuser,
                    user.full_name,
                    to_db_time(&Utc::now()),
                ],
            ).map_err(|e| write_error("Failed to create user", e))?;
            conn.last_insert_rowid()
        };

        self.get_user(id)?
            .ok_or_else(|| ManagerError::Internal(format!("User {} vanished after insert", id)))
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>, ManagerError> {
        self.find_user("id = ?1", rusqlite::types::Value::Integer(id))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ManagerError> {
        self.find_user("email = ?1", rusqlite::types::Value::Text(email.to_string()))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>, ManagerError> {
        self.find_user("username = ?1", rusqlite::types::Value::Text(username.to_string()))
    }

    fn find_user(&self, predicate: &str, value: rusqlite::types::Value) -> Result<Option<User>, ManagerError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, predicate);
        conn.query_row(&sql, [value], user_from_row)
            .optional()
            .map_err(|e| ManagerError::StoreUnavailable(format!("Query error: {}", e)))
    }

    pub fn list_users(&self, limit: usize, offset: usize) -> Result<Vec<User>, ManagerError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM users ORDER BY id LIMIT ?1 OFFSET ?2", USER_COLUMNS);
        let mut stmt = conn.prepare(&sql)
            .map_err(|e| ManagerError::StoreUnavailable(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(rusqlite::params![limit as i64, offset as i64], user_from_row)
            .map_err(|e| ManagerError::StoreUnavailable(format!("Query error: {}", e)))?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row.map_err(|e| ManagerError::StoreUnavailable(format!("Row error: {}", e)))?);
        }
        Ok(users)
    }

    /// Applies the given changes; `hashed_password` replaces the stored hash when set.
    pub fn update_user(
        &self,
        id: i64,
        changes: &UserChanges,
        hashed_password: Option<&str>,
    ) -> Result<Option<User>, ManagerError> {
        let affected = {
            let conn = self.lock()?;
            conn.execute(
                "UPDATE users SET username = COALESCE(?2, username), email = COALESCE(?3, email), hashed_password = COALESCE(?4, hashed_password), is_active = COALESCE(?5, is_active), full_name = COALESCE(?6, full_name), updated_at = ?7 WHERE id = ?1",
                rusqlite::params![
                    id,
                    changes.username,
                    changes.email,
                    hashed_password,
                    changes.is_active,
                    changes.full_name,
                    to_db_time(&Utc::now()),
                ],
            ).map_err(|e| write_error("Failed to update user", e))?
        };

        if affected == 0 {
            return Ok(None);
        }
        self.get_user(id)
    }

    pub fn delete_user(&self, id: i64) -> Result<bool, ManagerError> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![id])
            .map_err(|e| ManagerError::StoreUnavailable(format!("Delete failed: {}", e)))?;
        Ok(affected > 0)
    }

    pub fn count_superusers(&self) -> Result<i64, ManagerError> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM users WHERE is_superuser = 1", [], |row| row.get(0))
            .map_err(|e| ManagerError::StoreUnavailable(format!("Query error: {}", e)))
    }
}
