//! Aggregate views over a user's agents and tasks.

use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::models::{Agent, AgentLog, AgentStatus, Task, TaskStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub in_progress_tasks: usize,
    pub pending_tasks: usize,
}

impl TaskCounts {
    pub fn tally(tasks: &[Task]) -> Self {
        let mut counts = Self::default();
        for task in tasks {
            match task.status {
                TaskStatus::Completed => counts.completed_tasks += 1,
                TaskStatus::Failed => counts.failed_tasks += 1,
                TaskStatus::InProgress => counts.in_progress_tasks += 1,
                TaskStatus::Pending => counts.pending_tasks += 1,
                TaskStatus::Cancelled => {}
            }
        }
        counts
    }

    /// Completed share of finished work, as a whole percentage.
    pub fn success_rate(&self) -> u32 {
        let finished = self.completed_tasks + self.failed_tasks;
        if finished == 0 {
            0
        } else {
            (self.completed_tasks * 100 / finished) as u32
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub agent_count: usize,
    pub task_count: usize,
    pub agent_status_counts: BTreeMap<&'static str, usize>,
    pub task_status_counts: BTreeMap<&'static str, usize>,
    pub overall_progress: u32,
    #[serde(flatten)]
    pub counts: TaskCounts,
}

pub fn dashboard(agents: &[Agent], tasks: &[Task]) -> Dashboard {
    let mut agent_status_counts: BTreeMap<&'static str, usize> =
        AgentStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
    for agent in agents {
        *agent_status_counts.entry(agent.status.as_str()).or_default() += 1;
    }

    let mut task_status_counts: BTreeMap<&'static str, usize> =
        TaskStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
    for task in tasks {
        *task_status_counts.entry(task.status.as_str()).or_default() += 1;
    }

    let counts = TaskCounts::tally(tasks);
    let overall_progress = if tasks.is_empty() {
        0
    } else {
        (counts.completed_tasks * 100 / tasks.len()) as u32
    };

    Dashboard {
        agent_count: agents.len(),
        task_count: tasks.len(),
        agent_status_counts,
        task_status_counts,
        overall_progress,
        counts,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentStats {
    pub id: i64,
    pub name: String,
    pub status: AgentStatus,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub in_progress_tasks: usize,
    pub success_rate: u32,
    pub last_active: Option<DateTime<Utc>>,
}

/// `tasks` must be the tasks assigned to `agent`.
pub fn agent_stats(agent: &Agent, tasks: &[Task]) -> AgentStats {
    let counts = TaskCounts::tally(tasks);
    AgentStats {
        id: agent.id,
        name: agent.name.clone(),
        status: agent.status,
        total_tasks: tasks.len(),
        completed_tasks: counts.completed_tasks,
        failed_tasks: counts.failed_tasks,
        in_progress_tasks: counts.in_progress_tasks,
        success_rate: counts.success_rate(),
        last_active: agent.last_active,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskStats {
    pub total_tasks: usize,
    #[serde(flatten)]
    pub counts: TaskCounts,
    pub avg_completion_time_seconds: f64,
    pub tasks_by_priority: BTreeMap<i64, usize>,
}

pub fn task_stats(tasks: &[Task]) -> TaskStats {
    let times: Vec<f64> = completed_durations(tasks).map(|(_, secs)| secs).collect();
    let avg_completion_time_seconds = if times.is_empty() {
        0.0
    } else {
        times.iter().sum::<f64>() / times.len() as f64
    };

    let mut tasks_by_priority = BTreeMap::new();
    for task in tasks {
        *tasks_by_priority.entry(task.priority).or_insert(0) += 1;
    }

    TaskStats {
        total_tasks: tasks.len(),
        counts: TaskCounts::tally(tasks),
        avg_completion_time_seconds,
        tasks_by_priority,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionTime {
    pub task_id: i64,
    pub title: String,
    pub completion_time_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentPerformance {
    pub agent_id: i64,
    pub name: String,
    pub status: AgentStatus,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub in_progress_tasks: usize,
    pub task_completion_times: Vec<CompletionTime>,
    pub recent_logs: Vec<AgentLog>,
    pub last_active: Option<DateTime<Utc>>,
}

pub fn agent_performance(agent: &Agent, tasks: &[Task], recent_logs: Vec<AgentLog>) -> AgentPerformance {
    let counts = TaskCounts::tally(tasks);
    AgentPerformance {
        agent_id: agent.id,
        name: agent.name.clone(),
        status: agent.status,
        total_tasks: tasks.len(),
        completed_tasks: counts.completed_tasks,
        failed_tasks: counts.failed_tasks,
        in_progress_tasks: counts.in_progress_tasks,
        task_completion_times: completed_durations(tasks)
            .map(|(task, secs)| CompletionTime {
                task_id: task.id,
                title: task.title.clone(),
                completion_time_seconds: secs,
            })
            .collect(),
        recent_logs,
        last_active: agent.last_active,
    }
}

fn completed_durations(tasks: &[Task]) -> impl Iterator<Item = (&Task, f64)> {
    tasks.iter()
        .filter(|task| task.status == TaskStatus::Completed)
        .filter_map(|task| task.completion_seconds().map(|secs| (task, secs)))
}
