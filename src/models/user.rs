use std::sync::LazyLock;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::errors::ManagerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Owner-or-superuser access rule shared by every owned resource.
    pub fn can_access(&self, owner_id: i64) -> bool {
        self.is_superuser || self.id == owner_id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    pub full_name: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub full_name: Option<String>,
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email pattern compiles")
});

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_email(email: &str) -> Result<(), ManagerError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ManagerError::InvalidArgument(format!("Invalid email address: {}", email)))
    }
}

fn validate_username(username: &str) -> Result<(), ManagerError> {
    if username.trim().is_empty() {
        return Err(ManagerError::InvalidArgument("Username must not be empty".into()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ManagerError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ManagerError::InvalidArgument(format!(
            "Password must be at least {} characters", MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ManagerError> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

impl UserChanges {
    pub fn validate(&self) -> Result<(), ManagerError> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(email: &str, password: &str) -> NewUser {
        NewUser {
            username: "alice".into(),
            email: email.into(),
            password: password.into(),
            is_active: true,
            is_superuser: false,
            full_name: None,
        }
    }

    #[test]
    fn test_new_user_validation() {
        assert!(sample("alice@example.com", "correct horse").validate().is_ok());
        assert!(matches!(sample("not-an-email", "correct horse").validate(), Err(ManagerError::InvalidArgument(_))));
        assert!(matches!(sample("alice@example.com", "short").validate(), Err(ManagerError::InvalidArgument(_))));
    }

    #[test]
    fn test_changes_validate_only_present_fields() {
        assert!(UserChanges::default().validate().is_ok());
        let changes = UserChanges { email: Some("bad@".into()), ..Default::default() };
        assert!(changes.validate().is_err());
    }

    #[test]
    fn test_can_access() {
        let mut user: User = serde_json::from_value(serde_json::json!({
            "id": 7, "username": "u", "email": "u@example.com", "is_active": true,
            "is_superuser": false, "full_name": null,
            "created_at": "2024-01-01T00:00:00Z", "updated_at": null
        })).unwrap();
        assert!(user.can_access(7));
        assert!(!user.can_access(8));
        user.is_superuser = true;
        assert!(user.can_access(8));
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User {
            id: 1,
            username: "u".into(),
            email: "u@example.com".into(),
            hashed_password: "$pbkdf2-sha256$i=1,l=32$c2FsdHNhbHQ$aGFzaA".into(),
            is_active: true,
            is_superuser: false,
            full_name: None,
            created_at: chrono::Utc::now(),
            updated_at: None,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("hashed_password").is_none());
    }
}
