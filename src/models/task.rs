use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::errors::ManagerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states that stamp `completed_at`.
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ManagerError::InvalidArgument(format!("Invalid task status: {}", s)))
    }
}

/// Task priority, 0 (low) through 3 (critical).
pub const MAX_PRIORITY: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub owner_id: i64,
    pub agent_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: i64,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Moves the task to `status`, stamping `started_at` on the first entry into
    /// `in_progress` and `completed_at` on the first entry into a finished state.
    /// Existing timestamps are never overwritten.
    pub fn apply_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        if status == TaskStatus::InProgress && self.started_at.is_none() {
            self.started_at = Some(now);
        } else if status.is_finished() && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        self.status = status;
    }

    pub fn completion_seconds(&self) -> Option<f64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }
}

/// Validates a raw progress value against the inclusive 0..=100 range.
pub fn validate_progress(progress: i64) -> Result<u8, ManagerError> {
    if (0..=100).contains(&progress) {
        Ok(progress as u8)
    } else {
        Err(ManagerError::InvalidArgument("Progress must be between 0 and 100".into()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub owner_id: Option<i64>,
    pub agent_id: Option<i64>,
    pub description: Option<String>,
    pub priority: Option<i64>,
}

/// Descriptive fields an owner may edit. Status, progress and timestamps only
/// move through the tracker.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending_task() -> Task {
        Task {
            id: 5,
            owner_id: 7,
            agent_id: None,
            title: "crawl".into(),
            description: None,
            status: TaskStatus::Pending,
            priority: 0,
            progress: 0,
            created_at: Utc::now(),
            updated_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_in_progress_sets_started_at_once() {
        let mut task = pending_task();
        let first = Utc::now();
        task.apply_status(TaskStatus::InProgress, first);
        assert_eq!(task.started_at, Some(first));

        task.apply_status(TaskStatus::Pending, first + Duration::seconds(5));
        task.apply_status(TaskStatus::InProgress, first + Duration::seconds(10));
        assert_eq!(task.started_at, Some(first));
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_finished_sets_completed_at_once() {
        let mut task = pending_task();
        let done = Utc::now();
        task.apply_status(TaskStatus::Failed, done);
        assert_eq!(task.completed_at, Some(done));

        task.apply_status(TaskStatus::InProgress, done + Duration::seconds(1));
        task.apply_status(TaskStatus::Completed, done + Duration::seconds(2));
        assert_eq!(task.completed_at, Some(done));
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn test_cancelled_stamps_nothing() {
        let mut task = pending_task();
        task.apply_status(TaskStatus::Cancelled, Utc::now());
        assert!(task.started_at.is_none());
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_validate_progress_bounds() {
        assert_eq!(validate_progress(0).unwrap(), 0);
        assert_eq!(validate_progress(100).unwrap(), 100);
        assert!(matches!(validate_progress(-1), Err(ManagerError::InvalidArgument(_))));
        assert!(matches!(validate_progress(101), Err(ManagerError::InvalidArgument(_))));
    }

    #[test]
    fn test_task_status_names() {
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
        assert_eq!(serde_json::to_value(TaskStatus::InProgress).unwrap(), "in_progress");
        assert_eq!("cancelled".parse::<TaskStatus>().unwrap(), TaskStatus::Cancelled);
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_completion_seconds() {
        let mut task = pending_task();
        let start = Utc::now();
        task.apply_status(TaskStatus::InProgress, start);
        task.apply_status(TaskStatus::Completed, start + Duration::seconds(90));
        assert_eq!(task.completion_seconds(), Some(90.0));
    }
}
