use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use crate::api::AppState;
use crate::errors::ManagerError;
use crate::models::User;

/// The authenticated caller, placed in request extensions by [`require_user`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ManagerError> {
    let token = request.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(|| ManagerError::Authentication("Missing Authorization header".into()))?;

    let user = authenticate(&state, token.trim())?;
    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}

/// Resolves a bearer token to an active user.
pub fn authenticate(state: &AppState, token: &str) -> Result<User, ManagerError> {
    let claims = state.keys.verify(token)?;
    let user = state.db.get_user(claims.user_id()?)?
        .ok_or_else(|| ManagerError::Authentication("Could not validate credentials".into()))?;
    if !user.is_active {
        return Err(ManagerError::Authentication("Inactive user".into()));
    }
    Ok(user)
}

pub fn ensure_access(user: &User, owner_id: i64, what: &str) -> Result<(), ManagerError> {
    if user.can_access(owner_id) {
        Ok(())
    } else {
        Err(ManagerError::Permission(format!("Not enough permissions to access this {}", what)))
    }
}

pub fn ensure_superuser(user: &User) -> Result<(), ManagerError> {
    if user.is_superuser {
        Ok(())
    } else {
        Err(ManagerError::Permission("Superuser privileges required".into()))
    }
}
