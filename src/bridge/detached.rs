use async_trait::async_trait;
use tracing::debug;
use super::types::{AgentBridge, AgentLaunch, BridgeResult, BridgeStatus};

/// Bridge used when no bridge service is configured. Every command is
/// acknowledged immediately and nothing is executed, so agent records can
/// still be driven through their lifecycle.
#[derive(Debug, Default, Clone)]
pub struct DetachedBridge;

#[async_trait]
impl AgentBridge for DetachedBridge {
    async fn start(&self, config: &AgentLaunch) -> BridgeResult {
        debug!(agent_id = config.id, "Detached bridge acknowledging start");
        BridgeResult::ack(BridgeStatus::Running)
    }

    async fn stop(&self, agent_id: i64) -> BridgeResult {
        debug!(agent_id, "Detached bridge acknowledging stop");
        BridgeResult::ack(BridgeStatus::Stopped)
    }

    async fn pause(&self, agent_id: i64) -> BridgeResult {
        debug!(agent_id, "Detached bridge acknowledging pause");
        BridgeResult::ack(BridgeStatus::Paused)
    }

    async fn resume(&self, agent_id: i64) -> BridgeResult {
        debug!(agent_id, "Detached bridge acknowledging resume");
        BridgeResult::ack(BridgeStatus::Running)
    }

    async fn status(&self, _agent_id: i64) -> BridgeResult {
        BridgeResult::ack(BridgeStatus::Unknown)
    }

    fn name(&self) -> &str {
        "detached"
    }
}
