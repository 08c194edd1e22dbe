use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::errors::ManagerError;

/// Lifecycle state of an agent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Error,
    Terminated,
}

impl AgentStatus {
    pub const ALL: [AgentStatus; 5] = [
        AgentStatus::Idle,
        AgentStatus::Running,
        AgentStatus::Paused,
        AgentStatus::Error,
        AgentStatus::Terminated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Running => "running",
            AgentStatus::Paused => "paused",
            AgentStatus::Error => "error",
            AgentStatus::Terminated => "terminated",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ManagerError::InvalidArgument(format!("Invalid agent status: {}", s)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: AgentStatus,
    pub instance_url: Option<String>,
    pub api_key: Option<String>,
    pub max_tasks: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_active: Option<DateTime<Utc>>,
}

/// Fields accepted when creating an agent. New agents always start `idle`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub owner_id: Option<i64>,
    pub description: Option<String>,
    pub instance_url: Option<String>,
    pub api_key: Option<String>,
    pub max_tasks: Option<i64>,
}

/// Descriptive fields an owner may edit. Status only moves through the tracker.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub instance_url: Option<String>,
    pub api_key: Option<String>,
    pub max_tasks: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_status_parse_roundtrip() {
        for status in AgentStatus::ALL {
            assert_eq!(status.as_str().parse::<AgentStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_agent_status_rejects_unknown() {
        let err = "sleeping".parse::<AgentStatus>().unwrap_err();
        assert!(matches!(err, ManagerError::InvalidArgument(_)));
    }

    #[test]
    fn test_agent_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(AgentStatus::Terminated).unwrap(), "terminated");
    }
}
