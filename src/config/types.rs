use serde::{Deserialize, Serialize};

pub const ENV_SECRET_KEY: &str = "MANAGER_SECRET_KEY";
pub const ENV_BRIDGE_URL: &str = "MANAGER_BRIDGE_URL";
pub const ENV_DATABASE: &str = "MANAGER_DB";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ManagerConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub bridge: BridgeConfig,
    pub tracking: TrackingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8000 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: ".agent-manager/manager.db".into() }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    pub secret_key: Option<String>,
    pub token_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { secret_key: None, token_ttl_minutes: crate::auth::DEFAULT_TOKEN_TTL_MINUTES }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Base URL of the process bridge service. Unset means detached mode.
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { url: None, timeout_secs: 10 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TrackingConfig {
    pub default_log_limit: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self { default_log_limit: crate::tracker::DEFAULT_LOG_LIMIT }
    }
}

/// Values given on the command line; they win over env and file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub secret_key: Option<String>,
    pub bridge_url: Option<String>,
}

impl ManagerConfig {
    /// Layers environment values, then CLI overrides, over the file values.
    pub fn apply_overrides<F>(&mut self, lookup: F, cli: &ConfigOverrides)
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(secret) = env(ENV_SECRET_KEY) {
            self.auth.secret_key = Some(secret);
        }
        if let Some(url) = env(ENV_BRIDGE_URL) {
            self.bridge.url = Some(url);
        }
        if let Some(path) = env(ENV_DATABASE) {
            self.database.path = path;
        }

        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(path) = &cli.database {
            self.database.path = path.clone();
        }
        if let Some(secret) = &cli.secret_key {
            self.auth.secret_key = Some(secret.clone());
        }
        if let Some(url) = &cli.bridge_url {
            self.bridge.url = Some(url.clone());
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
        assert_eq!(config.auth.token_ttl_minutes, 30);
        assert_eq!(config.tracking.default_log_limit, 100);
        assert!(config.bridge.url.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = ManagerConfig::default();
        config.database.path = "from-file.db".into();
        config.apply_overrides(
            env_from(&[(ENV_DATABASE, "from-env.db"), (ENV_BRIDGE_URL, "http://bridge:9000")]),
            &ConfigOverrides::default(),
        );
        assert_eq!(config.database.path, "from-env.db");
        assert_eq!(config.bridge.url.as_deref(), Some("http://bridge:9000"));
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = ManagerConfig::default();
        let cli = ConfigOverrides {
            port: Some(9100),
            secret_key: Some("cli-secret-value-long".into()),
            ..Default::default()
        };
        config.apply_overrides(env_from(&[(ENV_SECRET_KEY, "env-secret-value-long")]), &cli);
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.auth.secret_key.as_deref(), Some("cli-secret-value-long"));
    }

    #[test]
    fn test_blank_env_ignored() {
        let mut config = ManagerConfig::default();
        config.apply_overrides(env_from(&[(ENV_DATABASE, "  ")]), &ConfigOverrides::default());
        assert_eq!(config.database.path, DatabaseConfig::default().path);
    }
}
