use std::path::Path;
use crate::auth::{TokenKeys, MAX_TOKEN_TTL_MINUTES};
use crate::errors::ManagerError;
use super::types::{ConfigOverrides, ManagerConfig};
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

const MIN_SECRET_LEN: usize = 16;

pub async fn parse_config(path: &Path) -> Result<ManagerConfig, ManagerError> {
    if !path.exists() {
        return Err(ManagerError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(ManagerError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&content)?;

    // Empty file means all defaults
    if yaml.is_null() {
        return Ok(ManagerConfig::default());
    }

    validate_schema(&yaml)?;

    let config: ManagerConfig = serde_yaml::from_value(yaml)
        .map_err(|e| ManagerError::Config(format!("Invalid config: {}", e)))?;
    validate_config(&config)?;

    Ok(config)
}

/// Reads the optional file, layers env and CLI values on top, then validates
/// the merged result.
pub async fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<ManagerConfig, ManagerError> {
    let mut config = match path {
        Some(path) => parse_config(path).await?,
        None => ManagerConfig::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok(), overrides);
    validate_config(&config)?;
    Ok(config)
}

/// Structural check against the JSON schema. Advisory: problems are logged.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), ManagerError> {
    let json_value = serde_json::to_value(yaml)
        .map_err(|e| ManagerError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| ManagerError::Config(format!("Schema compilation error: {}", e)))?;

    if let Err(errors) = compiled.validate(&json_value) {
        for e in errors {
            warn!(validation_error = %e, path = %e.instance_path, "Config schema warning");
        }
    }

    Ok(())
}

/// Semantic checks that make a config unusable.
pub fn validate_config(config: &ManagerConfig) -> Result<(), ManagerError> {
    if config.server.port == 0 {
        return Err(ManagerError::Config("server.port must be non-zero".into()));
    }
    if config.database.path.trim().is_empty() {
        return Err(ManagerError::Config("database.path must not be empty".into()));
    }
    if config.auth.token_ttl_minutes <= 0 {
        return Err(ManagerError::Config("auth.token_ttl_minutes must be positive".into()));
    }
    if config.auth.token_ttl_minutes > MAX_TOKEN_TTL_MINUTES {
        return Err(ManagerError::Config(format!(
            "auth.token_ttl_minutes must be at most {}", MAX_TOKEN_TTL_MINUTES
        )));
    }
    if let Some(secret) = &config.auth.secret_key {
        if secret.chars().count() < MIN_SECRET_LEN {
            return Err(ManagerError::Config(format!(
                "auth.secret_key must be at least {} characters", MIN_SECRET_LEN
            )));
        }
    }
    if let Some(url) = &config.bridge.url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ManagerError::Config(format!("bridge.url must be an http(s) URL: {}", url)));
        }
    }
    if config.bridge.timeout_secs == 0 {
        return Err(ManagerError::Config("bridge.timeout_secs must be positive".into()));
    }
    if config.tracking.default_log_limit == 0 {
        return Err(ManagerError::Config("tracking.default_log_limit must be positive".into()));
    }
    Ok(())
}
