use axum::{
    extract::{Path, State},
    Extension, Json,
};
use crate::analytics::{self, AgentPerformance, AgentStats, Dashboard, TaskStats};
use crate::api::auth::AuthUser;
use crate::api::AppState;
use crate::db::{AgentFilter, TaskFilter, NO_LIMIT};
use crate::errors::ManagerError;
use crate::models::Task;
use super::agents::load_agent;

fn assigned_tasks(state: &AppState, agent_id: i64) -> Result<Vec<Task>, ManagerError> {
    let filter = TaskFilter { agent_id: Some(agent_id), ..Default::default() };
    state.db.list_tasks(&filter, NO_LIMIT, 0)
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
) -> Result<Json<Dashboard>, ManagerError> {
    let agents = state.db.list_agents(&AgentFilter { owner_id: Some(caller.id), ..Default::default() }, NO_LIMIT, 0)?;
    let tasks = state.db.list_tasks(&TaskFilter { owner_id: Some(caller.id), ..Default::default() }, NO_LIMIT, 0)?;
    Ok(Json(analytics::dashboard(&agents, &tasks)))
}

pub async fn agent_stats(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
) -> Result<Json<Vec<AgentStats>>, ManagerError> {
    let agents = state.db.list_agents(&AgentFilter { owner_id: Some(caller.id), ..Default::default() }, NO_LIMIT, 0)?;
    let mut stats = Vec::with_capacity(agents.len());
    for agent in &agents {
        stats.push(analytics::agent_stats(agent, &assigned_tasks(&state, agent.id)?));
    }
    Ok(Json(stats))
}

pub async fn task_stats(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
) -> Result<Json<TaskStats>, ManagerError> {
    let tasks = state.db.list_tasks(&TaskFilter { owner_id: Some(caller.id), ..Default::default() }, NO_LIMIT, 0)?;
    Ok(Json(analytics::task_stats(&tasks)))
}

pub async fn agent_performance(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<AgentPerformance>, ManagerError> {
    let agent = load_agent(&state, &caller, id)?;
    let tasks = assigned_tasks(&state, id)?;
    let logs = state.tracker.get_agent_logs(id, state.default_log_limit)?;
    Ok(Json(analytics::agent_performance(&agent, &tasks, logs)))
}
