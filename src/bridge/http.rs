use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use crate::errors::ManagerError;
use super::types::{AgentBridge, AgentLaunch, BridgeResult};

/// Client for the bridge service's HTTP API.
pub struct HttpBridge {
    client: Client,
    base_url: String,
}

impl HttpBridge {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ManagerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ManagerError::Config(format!("Failed to build bridge client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call(&self, request: reqwest::RequestBuilder, op: &str) -> BridgeResult {
        let resp = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(op, error = %e, "Bridge request failed");
                return BridgeResult::failed(format!("Bridge request failed: {}", e));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(op, status = status.as_u16(), "Bridge returned an error status");
            return BridgeResult::failed(format!("Bridge returned {}: {}", status.as_u16(), body));
        }

        match resp.json::<BridgeResult>().await {
            Ok(result) => {
                debug!(op, status = ?result.status, "Bridge responded");
                result
            }
            Err(e) => BridgeResult::failed(format!("Failed to parse bridge response: {}", e)),
        }
    }
}

#[async_trait]
impl AgentBridge for HttpBridge {
    async fn start(&self, config: &AgentLaunch) -> BridgeResult {
        let request = self.client
            .post(format!("{}/agents/start", self.base_url))
            .json(config);
        self.call(request, "start").await
    }

    async fn stop(&self, agent_id: i64) -> BridgeResult {
        let request = self.client.post(format!("{}/agents/{}/stop", self.base_url, agent_id));
        self.call(request, "stop").await
    }

    async fn pause(&self, agent_id: i64) -> BridgeResult {
        let request = self.client.post(format!("{}/agents/{}/pause", self.base_url, agent_id));
        self.call(request, "pause").await
    }

    async fn resume(&self, agent_id: i64) -> BridgeResult {
        let request = self.client.post(format!("{}/agents/{}/resume", self.base_url, agent_id));
        self.call(request, "resume").await
    }

    async fn status(&self, agent_id: i64) -> BridgeResult {
        let request = self.client.get(format!("{}/agents/{}/status", self.base_url, agent_id));
        self.call(request, "status").await
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use crate::bridge::BridgeStatus;

    async fn spawn_fake_bridge() -> String {
        let app = Router::new()
            .route("/agents/start", post(|Json(body): Json<Value>| async move {
                Json(json!({"status": "running", "agent_id": body["id"], "process_id": 77}))
            }))
            .route("/agents/{id}/pause", post(|Path(id): Path<i64>| async move {
                Json(json!({"status": "paused", "agent_id": id}))
            }))
            .route("/agents/{id}/stop", post(|Path(id): Path<i64>| async move {
                Json(json!({"status": "error", "agent_id": id, "error": "Agent not running or PID file not found"}))
            }))
            .route("/agents/{id}/resume", post(|| async {
                (StatusCode::INTERNAL_SERVER_ERROR, "boom")
            }))
            .route("/agents/{id}/status", get(|| async { "not json" }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn launch() -> AgentLaunch {
        AgentLaunch {
            id: 3,
            name: "scout".into(),
            description: None,
            owner_id: 1,
            api_key: None,
            instance_url: None,
            max_tasks: 5,
        }
    }

    #[tokio::test]
    async fn test_http_bridge_acknowledgements() {
        let url = spawn_fake_bridge().await;
        let bridge = HttpBridge::new(&url, Duration::from_secs(5)).unwrap();

        let started = bridge.start(&launch()).await;
        assert_eq!(started.status, BridgeStatus::Running);
        assert_eq!(started.process_id, Some(77));

        assert_eq!(bridge.pause(3).await.status, BridgeStatus::Paused);
    }

    #[tokio::test]
    async fn test_http_bridge_failures_become_error_results() {
        let url = spawn_fake_bridge().await;
        let bridge = HttpBridge::new(&url, Duration::from_secs(5)).unwrap();

        let stopped = bridge.stop(3).await;
        assert_eq!(stopped.status, BridgeStatus::Error);
        assert_eq!(stopped.error.as_deref(), Some("Agent not running or PID file not found"));

        let resumed = bridge.resume(3).await;
        assert_eq!(resumed.status, BridgeStatus::Error);
        assert!(resumed.error_message().contains("500"));

        let status = bridge.status(3).await;
        assert_eq!(status.status, BridgeStatus::Error);
        assert!(status.error_message().contains("parse"));
    }

    #[tokio::test]
    async fn test_http_bridge_unreachable() {
        let bridge = HttpBridge::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let result = bridge.stop(1).await;
        assert_eq!(result.status, BridgeStatus::Error);
        assert!(result.error.is_some());
    }
}
