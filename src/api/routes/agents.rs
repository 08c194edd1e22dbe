use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;
use crate::api::auth::{ensure_access, AuthUser};
use crate::api::models::{AgentListQuery, DEFAULT_PAGE_SIZE};
use crate::api::AppState;
use crate::db::AgentFilter;
use crate::errors::ManagerError;
use crate::models::{Agent, AgentChanges, AgentStatus, NewAgent, User};

/// Loads an agent the caller may act on: 404 before 403.
pub(crate) fn load_agent(state: &AppState, caller: &User, id: i64) -> Result<Agent, ManagerError> {
    let agent = state.db.get_agent(id)?
        .ok_or_else(|| ManagerError::NotFound(format!("Agent {} not found", id)))?;
    ensure_access(caller, agent.owner_id, "agent")?;
    Ok(agent)
}

/// Resolves the owner of a new record. Only superusers can name another user,
/// and that user must exist.
pub(crate) fn resolve_owner(state: &AppState, caller: &User, requested: Option<i64>) -> Result<i64, ManagerError> {
    let owner_id = requested.unwrap_or(caller.id);
    ensure_access(caller, owner_id, "owner")?;
    if owner_id != caller.id && state.db.get_user(owner_id)?.is_none() {
        return Err(ManagerError::NotFound(format!("User {} not found", owner_id)));
    }
    Ok(owner_id)
}

pub async fn create_agent(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Json(req): Json<NewAgent>,
) -> Result<(StatusCode, Json<Agent>), ManagerError> {
    let owner_id = resolve_owner(&state, &caller, req.owner_id)?;
    if req.name.trim().is_empty() {
        return Err(ManagerError::InvalidArgument("Agent name must not be empty".into()));
    }

    let agent = state.db.create_agent(owner_id, &req)?;
    info!(agent_id = agent.id, owner_id, "Agent created");
    Ok((StatusCode::CREATED, Json(agent)))
}

pub async fn list_agents(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Query(query): Query<AgentListQuery>,
) -> Result<Json<Vec<Agent>>, ManagerError> {
    let filter = AgentFilter {
        owner_id: Some(caller.id),
        status: query.status.as_deref().map(str::parse::<AgentStatus>).transpose()?,
    };
    let agents = state.db.list_agents(
        &filter,
        query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        query.skip.unwrap_or(0),
    )?;
    Ok(Json(agents))
}

pub async fn get_agent(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Agent>, ManagerError> {
    Ok(Json(load_agent(&state, &caller, id)?))
}

pub async fn update_agent(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(changes): Json<AgentChanges>,
) -> Result<Json<Agent>, ManagerError> {
    load_agent(&state, &caller, id)?;
    let agent = state.db.update_agent(id, &changes)?
        .ok_or_else(|| ManagerError::NotFound(format!("Agent {} not found", id)))?;
    Ok(Json(agent))
}

pub async fn delete_agent(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ManagerError> {
    load_agent(&state, &caller, id)?;
    if !state.db.delete_agent(id)? {
        return Err(ManagerError::NotFound(format!("Agent {} not found", id)));
    }
    info!(agent_id = id, "Agent deleted");
    Ok(Json(json!({"deleted": true})))
}

pub async fn start_agent(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Agent>, ManagerError> {
    load_agent(&state, &caller, id)?;
    Ok(Json(state.tracker.start_agent(id).await?))
}

pub async fn stop_agent(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Agent>, ManagerError> {
    load_agent(&state, &caller, id)?;
    Ok(Json(state.tracker.stop_agent(id).await?))
}

pub async fn pause_agent(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Agent>, ManagerError> {
    load_agent(&state, &caller, id)?;
    Ok(Json(state.tracker.pause_agent(id).await?))
}

pub async fn resume_agent(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Agent>, ManagerError> {
    load_agent(&state, &caller, id)?;
    Ok(Json(state.tracker.resume_agent(id).await?))
}

pub async fn bridge_status(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ManagerError> {
    load_agent(&state, &caller, id)?;
    let (agent, report) = state.tracker.refresh_agent_status(id).await?;
    Ok(Json(json!({
        "agent": agent,
        "bridge": state.tracker.bridge_name(),
        "report": report,
    })))
}
