use std::sync::Arc;
use chrono::Utc;
use tracing::{info, warn};
use crate::bridge::{AgentBridge, AgentLaunch, BridgeResult, BridgeStatus};
use crate::db::Database;
use crate::errors::ManagerError;
use crate::models::{validate_progress, Agent, AgentLog, AgentStatus, LogLevel, Task, TaskLog, TaskStatus};
use super::events::{AgentUpdate, LogUpdate, Notification, TaskUpdate};
use super::registry::ChannelRegistry;

pub const DEFAULT_LOG_LIMIT: usize = 100;

/// Bridge commands the tracker can issue for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeCommand {
    Start,
    Stop,
    Pause,
    Resume,
}

impl BridgeCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeCommand::Start => "start",
            BridgeCommand::Stop => "stop",
            BridgeCommand::Pause => "pause",
            BridgeCommand::Resume => "resume",
        }
    }

    /// Agent status to commit when the bridge reports `reported`, or `None`
    /// when the report is not an acknowledgment of this command.
    fn acknowledged(&self, reported: BridgeStatus) -> Option<AgentStatus> {
        match (self, reported) {
            (BridgeCommand::Start | BridgeCommand::Resume, BridgeStatus::Running) => Some(AgentStatus::Running),
            (BridgeCommand::Pause, BridgeStatus::Paused) => Some(AgentStatus::Paused),
            (BridgeCommand::Stop, BridgeStatus::Stopped | BridgeStatus::Idle) => Some(AgentStatus::Idle),
            _ => None,
        }
    }
}

/// Maps a status report onto the agent record; `None` leaves it untouched.
fn reported_agent_status(reported: BridgeStatus) -> Option<AgentStatus> {
    match reported {
        BridgeStatus::Running => Some(AgentStatus::Running),
        BridgeStatus::Paused => Some(AgentStatus::Paused),
        BridgeStatus::Idle | BridgeStatus::Stopped => Some(AgentStatus::Idle),
        BridgeStatus::Error => Some(AgentStatus::Error),
        BridgeStatus::Unknown => None,
    }
}

/// Sole writer of agent status and task progress.
///
/// Every mutation is persisted, then logged, then broadcast to the owner's
/// channels. Broadcast failures are absorbed by the registry and never undo
/// the first two steps.
#[derive(Clone)]
pub struct StatusTracker {
    db: Database,
    registry: ChannelRegistry,
    bridge: Arc<dyn AgentBridge>,
}

impl StatusTracker {
    pub fn new(db: Database, registry: ChannelRegistry, bridge: Arc<dyn AgentBridge>) -> Self {
        Self { db, registry, bridge }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn bridge_name(&self) -> &str {
        self.bridge.name()
    }

    pub fn update_agent_status(&self, agent_id: i64, status: AgentStatus) -> Result<Agent, ManagerError> {
        let agent = self.db.set_agent_status(agent_id, status, Utc::now())?
            .ok_or_else(|| ManagerError::NotFound(format!("Agent {} not found", agent_id)))?;
        info!(agent_id, status = %status, "Agent status updated");

        self.log_agent(&agent, LogLevel::Info, &format!("Agent status changed to {}", status))?;
        self.notify(agent.owner_id, Notification::AgentUpdate(AgentUpdate::from(&agent)));
        Ok(agent)
    }

    /// Sets progress and, when `status` is given, moves the task to it under the
    /// first-entry timestamp rules of [`Task::apply_status`].
    pub fn update_task_progress(
        &self,
        task_id: i64,
        progress: i64,
        status: Option<TaskStatus>,
    ) -> Result<Task, ManagerError> {
        let progress = validate_progress(progress)?;
        let now = Utc::now();
        let task = self.db.mutate_task(task_id, |task| {
            task.progress = progress;
            if let Some(status) = status {
                task.apply_status(status, now);
            }
            Ok(())
        })?.ok_or_else(|| ManagerError::NotFound(format!("Task {} not found", task_id)))?;
        info!(task_id, progress, status = ?status, "Task progress updated");

        let message = match status {
            Some(status) => format!("Task progress updated to {}% with status {}", progress, status),
            None => format!("Task progress updated to {}%", progress),
        };
        self.log_task(&task, LogLevel::Info, &message)?;
        self.notify(task.owner_id, Notification::TaskUpdate(TaskUpdate::from(&task)));
        Ok(task)
    }

    /// Assigns a task to an agent of the same owner. A pending task starts.
    pub fn assign_task(&self, task_id: i64, agent_id: i64) -> Result<Task, ManagerError> {
        let current = self.require_task(task_id)?;
        let agent = self.require_agent(agent_id)?;
        if agent.owner_id != current.owner_id {
            return Err(ManagerError::Permission(format!(
                "Agent {} does not belong to the owner of task {}",
                agent_id, task_id
            )));
        }

        let now = Utc::now();
        let mut started = false;
        let task = self.db.mutate_task(task_id, |task| {
            task.agent_id = Some(agent_id);
            if task.status == TaskStatus::Pending {
                task.apply_status(TaskStatus::InProgress, now);
                started = true;
            }
            Ok(())
        })?.ok_or_else(|| ManagerError::NotFound(format!("Task {} not found", task_id)))?;
        info!(task_id, agent_id, started, "Task assigned");

        let message = if started {
            format!("Task assigned to agent {} with status {}", agent_id, TaskStatus::InProgress)
        } else {
            format!("Task assigned to agent {}", agent_id)
        };
        self.log_task(&task, LogLevel::Info, &message)?;
        self.notify(task.owner_id, Notification::TaskUpdate(TaskUpdate::from(&task)));
        Ok(task)
    }

    pub fn get_agent_logs(&self, agent_id: i64, limit: usize) -> Result<Vec<AgentLog>, ManagerError> {
        self.require_agent(agent_id)?;
        self.db.agent_logs(agent_id, limit)
    }

    pub fn get_task_logs(&self, task_id: i64, limit: usize) -> Result<Vec<TaskLog>, ManagerError> {
        self.require_task(task_id)?;
        self.db.task_logs(task_id, limit)
    }

    pub async fn start_agent(&self, agent_id: i64) -> Result<Agent, ManagerError> {
        let agent = self.require_agent(agent_id)?;
        let result = self.bridge.start(&AgentLaunch::from(&agent)).await;
        self.settle(&agent, BridgeCommand::Start, result)
    }

    pub async fn stop_agent(&self, agent_id: i64) -> Result<Agent, ManagerError> {
        let agent = self.require_agent(agent_id)?;
        let result = self.bridge.stop(agent_id).await;
        self.settle(&agent, BridgeCommand::Stop, result)
    }

    pub async fn pause_agent(&self, agent_id: i64) -> Result<Agent, ManagerError> {
        let agent = self.require_agent(agent_id)?;
        let result = self.bridge.pause(agent_id).await;
        self.settle(&agent, BridgeCommand::Pause, result)
    }

    pub async fn resume_agent(&self, agent_id: i64) -> Result<Agent, ManagerError> {
        let agent = self.require_agent(agent_id)?;
        let result = self.bridge.resume(agent_id).await;
        self.settle(&agent, BridgeCommand::Resume, result)
    }

    /// Pulls the bridge's view of the agent and records it if it differs.
    pub async fn refresh_agent_status(&self, agent_id: i64) -> Result<(Agent, BridgeResult), ManagerError> {
        let agent = self.require_agent(agent_id)?;
        let result = self.bridge.status(agent_id).await;
        let agent = match reported_agent_status(result.status) {
            Some(status) if status != agent.status => self.update_agent_status(agent_id, status)?,
            _ => agent,
        };
        Ok((agent, result))
    }

    fn settle(&self, agent: &Agent, command: BridgeCommand, result: BridgeResult) -> Result<Agent, ManagerError> {
        if let Some(status) = command.acknowledged(result.status) {
            return self.update_agent_status(agent.id, status);
        }

        let error = result.error_message();
        warn!(agent_id = agent.id, command = command.as_str(), bridge = self.bridge.name(), error = %error, "Bridge did not acknowledge command");
        self.log_agent(agent, LogLevel::Error, &format!("Bridge {} failed: {}", command.as_str(), error))?;
        Err(ManagerError::BridgeRejected(format!("{} agent {}: {}", command.as_str(), agent.id, error)))
    }

    fn log_agent(&self, agent: &Agent, level: LogLevel, message: &str) -> Result<AgentLog, ManagerError> {
        let log = self.db.append_agent_log(agent.id, level, message)?;
        self.notify(agent.owner_id, Notification::LogUpdate(LogUpdate::from(&log)));
        Ok(log)
    }

    fn log_task(&self, task: &Task, level: LogLevel, message: &str) -> Result<TaskLog, ManagerError> {
        let log = self.db.append_task_log(task.id, level, message)?;
        self.notify(task.owner_id, Notification::LogUpdate(LogUpdate::from(&log)));
        Ok(log)
    }

    fn notify(&self, user_id: i64, event: Notification) {
        let report = self.registry.broadcast(user_id, &event);
        if !report.pruned.is_empty() {
            warn!(user_id, event = event.event_type(), pruned = report.pruned.len(), "Pruned channels during broadcast");
        }
    }

    fn require_agent(&self, agent_id: i64) -> Result<Agent, ManagerError> {
        self.db.get_agent(agent_id)?
            .ok_or_else(|| ManagerError::NotFound(format!("Agent {} not found", agent_id)))
    }

    fn require_task(&self, task_id: i64) -> Result<Task, ManagerError> {
        self.db.get_task(task_id)?
            .ok_or_else(|| ManagerError::NotFound(format!("Task {} not found", task_id)))
    }
}
