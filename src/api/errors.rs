use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::error;
use crate::errors::ManagerError;

impl ManagerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ManagerError::NotFound(_) => StatusCode::NOT_FOUND,
            ManagerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ManagerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ManagerError::Permission(_) => StatusCode::FORBIDDEN,
            ManagerError::Conflict(_) => StatusCode::CONFLICT,
            ManagerError::BridgeRejected(_) => StatusCode::BAD_GATEWAY,
            ManagerError::Json(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ManagerError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let message = match &self {
            ManagerError::NotFound(m)
            | ManagerError::InvalidArgument(m)
            | ManagerError::Authentication(m)
            | ManagerError::Permission(m)
            | ManagerError::Conflict(m)
            | ManagerError::BridgeRejected(m) => m.clone(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        (status, Json(json!({"error": message}))).into_response()
    }
}
