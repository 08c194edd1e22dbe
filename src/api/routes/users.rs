use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;
use crate::api::auth::{ensure_superuser, AuthUser};
use crate::api::models::ListQuery;
use crate::api::AppState;
use crate::auth::hash_password;
use crate::errors::ManagerError;
use crate::models::{NewUser, User, UserChanges};

fn user_not_found(id: i64) -> ManagerError {
    ManagerError::NotFound(format!("User {} not found", id))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ManagerError> {
    ensure_superuser(&caller)?;
    req.validate()?;

    let hashed = hash_password(&req.password)?;
    let user = state.db.create_user(&req, &hashed)?;
    info!(user_id = user.id, created_by = caller.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<User>>, ManagerError> {
    ensure_superuser(&caller)?;
    let (limit, offset) = query.page();
    Ok(Json(state.db.list_users(limit, offset)?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ManagerError> {
    if caller.id == id {
        return Ok(Json(caller));
    }
    ensure_superuser(&caller)?;
    let user = state.db.get_user(id)?.ok_or_else(|| user_not_found(id))?;
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(changes): Json<UserChanges>,
) -> Result<Json<User>, ManagerError> {
    if caller.id != id || changes.is_active.is_some() {
        ensure_superuser(&caller)?;
    }
    changes.validate()?;

    let hashed = changes.password.as_deref().map(hash_password).transpose()?;
    let user = state.db.update_user(id, &changes, hashed.as_deref())?
        .ok_or_else(|| user_not_found(id))?;
    info!(user_id = id, updated_by = caller.id, "User updated");
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ManagerError> {
    ensure_superuser(&caller)?;
    if caller.id == id {
        return Err(ManagerError::InvalidArgument("Users cannot delete themselves".into()));
    }
    if !state.db.delete_user(id)? {
        return Err(user_not_found(id));
    }
    info!(user_id = id, deleted_by = caller.id, "User deleted");
    Ok(Json(json!({"deleted": true})))
}
