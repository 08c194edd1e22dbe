pub mod events;
pub mod registry;
pub mod service;

pub use events::{AgentUpdate, LogUpdate, Notification, TaskUpdate};
pub use registry::{ChannelId, ChannelRegistry, DeliveryReport, NotificationChannel};
pub use service::{BridgeCommand, StatusTracker, DEFAULT_LOG_LIMIT};
