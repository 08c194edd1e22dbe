use axum::{extract::State, Extension, Json};
use tracing::{info, warn};
use crate::api::auth::AuthUser;
use crate::api::models::{LoginRequest, TokenResponse};
use crate::api::AppState;
use crate::auth::verify_password;
use crate::errors::ManagerError;
use crate::models::User;

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ManagerError> {
    let invalid = || ManagerError::Authentication("Incorrect email or password".into());

    let user = state.db.get_user_by_email(&req.email)?.ok_or_else(invalid)?;
    if !verify_password(&req.password, &user.hashed_password) {
        warn!(user_id = user.id, "Failed login attempt");
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ManagerError::Authentication("Inactive user".into()));
    }

    let access_token = state.keys.issue(user.id)?;
    info!(user_id = user.id, "User logged in");
    Ok(Json(TokenResponse { access_token, token_type: "bearer", user }))
}

pub async fn me(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<User> {
    Json(user)
}
