use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Permission error: {0}")]
    Permission(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Delivery failure: {0}")]
    Delivery(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Bridge rejected command: {0}")]
    BridgeRejected(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for ManagerError {
    fn from(e: rusqlite::Error) -> Self {
        ManagerError::StoreUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rusqlite_error_maps_to_store_unavailable() {
        let err: ManagerError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, ManagerError::StoreUnavailable(_)));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ManagerError::NotFound("Agent 3".into()).to_string(),
            "Not found: Agent 3"
        );
        assert_eq!(
            ManagerError::InvalidArgument("Progress must be between 0 and 100".into()).to_string(),
            "Invalid argument: Progress must be between 0 and 100"
        );
    }
}
