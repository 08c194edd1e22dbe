use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::models::{Agent, AgentLog, AgentStatus, LogLevel, Task, TaskLog, TaskStatus};

/// Event pushed to every notification channel of an entity's owner.
/// Serializes as `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Notification {
    AgentUpdate(AgentUpdate),
    TaskUpdate(TaskUpdate),
    LogUpdate(LogUpdate),
}

impl Notification {
    pub fn event_type(&self) -> &'static str {
        match self {
            Notification::AgentUpdate(_) => "agent_update",
            Notification::TaskUpdate(_) => "task_update",
            Notification::LogUpdate(_) => "log_update",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentUpdate {
    pub id: i64,
    pub name: String,
    pub status: AgentStatus,
    pub last_active: Option<DateTime<Utc>>,
}

impl From<&Agent> for AgentUpdate {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            name: agent.name.clone(),
            status: agent.status,
            last_active: agent.last_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub id: i64,
    pub title: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Task> for TaskUpdate {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            status: task.status,
            progress: task.progress,
            started_at: task.started_at,
            completed_at: task.completed_at,
        }
    }
}

/// A freshly appended agent or task log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogUpdate {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub agent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub task_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl From<&AgentLog> for LogUpdate {
    fn from(log: &AgentLog) -> Self {
        Self {
            id: log.id,
            agent_id: Some(log.agent_id),
            task_id: None,
            timestamp: log.timestamp,
            level: log.level,
            message: log.message.clone(),
        }
    }
}

impl From<&TaskLog> for LogUpdate {
    fn from(log: &TaskLog) -> Self {
        Self {
            id: log.id,
            agent_id: None,
            task_id: Some(log.task_id),
            timestamp: log.timestamp,
            level: log.level,
            message: log.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_update_wire_shape() {
        let event = Notification::AgentUpdate(AgentUpdate {
            id: 1,
            name: "scout".into(),
            status: AgentStatus::Running,
            last_active: None,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({
            "type": "agent_update",
            "data": {"id": 1, "name": "scout", "status": "running", "last_active": null}
        }));
        assert_eq!(event.event_type(), "agent_update");
    }

    #[test]
    fn test_task_update_nulls_unset_timestamps() {
        let event = Notification::TaskUpdate(TaskUpdate {
            id: 5,
            title: "crawl".into(),
            status: TaskStatus::InProgress,
            progress: 50,
            started_at: None,
            completed_at: None,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "task_update");
        assert_eq!(value["data"]["status"], "in_progress");
        assert!(value["data"]["started_at"].is_null());
        assert!(value["data"]["completed_at"].is_null());
    }

    #[test]
    fn test_log_update_omits_other_parent() {
        let log = TaskLog {
            id: 9,
            task_id: 5,
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: "Task progress updated to 10%".into(),
        };
        let value = serde_json::to_value(Notification::LogUpdate(LogUpdate::from(&log))).unwrap();
        assert_eq!(value["type"], "log_update");
        assert_eq!(value["data"]["task_id"], 5);
        assert!(value["data"].get("agent_id").is_none());
    }
}
