use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::models::Agent;

/// Process state as reported by the bridge service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeStatus {
    Running,
    Idle,
    Paused,
    Stopped,
    Error,
    #[serde(other)]
    Unknown,
}

/// Outcome of a bridge call. Transport failures are folded into
/// `status = error` so callers only ever inspect one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeResult {
    pub status: BridgeStatus,
    #[serde(default)]
    pub process_id: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

impl BridgeResult {
    pub fn ack(status: BridgeStatus) -> Self {
        Self { status, process_id: None, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { status: BridgeStatus::Error, process_id: None, error: Some(error.into()) }
    }

    pub fn error_message(&self) -> String {
        self.error.clone().unwrap_or_else(|| format!("unexpected bridge status {:?}", self.status))
    }
}

/// Launch configuration sent to the bridge on start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLaunch {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub api_key: Option<String>,
    pub instance_url: Option<String>,
    pub max_tasks: i64,
}

impl From<&Agent> for AgentLaunch {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            name: agent.name.clone(),
            description: agent.description.clone(),
            owner_id: agent.owner_id,
            api_key: agent.api_key.clone(),
            instance_url: agent.instance_url.clone(),
            max_tasks: agent.max_tasks,
        }
    }
}

#[async_trait]
pub trait AgentBridge: Send + Sync {
    async fn start(&self, config: &AgentLaunch) -> BridgeResult;

    async fn stop(&self, agent_id: i64) -> BridgeResult;

    async fn pause(&self, agent_id: i64) -> BridgeResult;

    async fn resume(&self, agent_id: i64) -> BridgeResult;

    async fn status(&self, agent_id: i64) -> BridgeResult;

    /// Backend name for logging
    fn name(&self) -> &str;
}
