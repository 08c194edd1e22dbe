use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;
use crate::api::auth::{ensure_access, AuthUser};
use crate::api::models::{TaskListQuery, DEFAULT_PAGE_SIZE};
use crate::api::AppState;
use crate::db::TaskFilter;
use crate::errors::ManagerError;
use crate::models::{NewTask, Task, TaskChanges, TaskStatus, User};
use super::agents::{load_agent, resolve_owner};

pub(crate) fn load_task(state: &AppState, caller: &User, id: i64) -> Result<Task, ManagerError> {
    let task = state.db.get_task(id)?
        .ok_or_else(|| ManagerError::NotFound(format!("Task {} not found", id)))?;
    ensure_access(caller, task.owner_id, "task")?;
    Ok(task)
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Json(req): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ManagerError> {
    let owner_id = resolve_owner(&state, &caller, req.owner_id)?;
    if req.title.trim().is_empty() {
        return Err(ManagerError::InvalidArgument("Task title must not be empty".into()));
    }
    if let Some(agent_id) = req.agent_id {
        let agent = load_agent(&state, &caller, agent_id)?;
        if agent.owner_id != owner_id {
            return Err(ManagerError::Permission(format!(
                "Agent {} does not belong to user {}", agent_id, owner_id
            )));
        }
    }

    let task = state.db.create_task(owner_id, &req)?;
    info!(task_id = task.id, owner_id, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<Task>>, ManagerError> {
    let filter = TaskFilter {
        owner_id: Some(caller.id),
        status: query.status.as_deref().map(str::parse::<TaskStatus>).transpose()?,
        agent_id: query.agent_id,
    };
    let tasks = state.db.list_tasks(
        &filter,
        query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        query.skip.unwrap_or(0),
    )?;
    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Task>, ManagerError> {
    Ok(Json(load_task(&state, &caller, id)?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(changes): Json<TaskChanges>,
) -> Result<Json<Task>, ManagerError> {
    load_task(&state, &caller, id)?;
    let task = state.db.update_task(id, &changes)?
        .ok_or_else(|| ManagerError::NotFound(format!("Task {} not found", id)))?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ManagerError> {
    load_task(&state, &caller, id)?;
    if !state.db.delete_task(id)? {
        return Err(ManagerError::NotFound(format!("Task {} not found", id)));
    }
    info!(task_id = id, "Task deleted");
    Ok(Json(json!({"deleted": true})))
}

pub async fn assign_task(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path((id, agent_id)): Path<(i64, i64)>,
) -> Result<Json<Task>, ManagerError> {
    load_task(&state, &caller, id)?;
    load_agent(&state, &caller, agent_id)?;
    Ok(Json(state.tracker.assign_task(id, agent_id)?))
}
