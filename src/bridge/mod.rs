pub mod detached;
pub mod http;
pub mod types;

pub use detached::DetachedBridge;
pub use http::HttpBridge;
pub use types::{AgentBridge, AgentLaunch, BridgeResult, BridgeStatus};
