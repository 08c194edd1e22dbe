pub mod agents;
pub mod connection;
pub mod logs;
pub mod schema;
pub mod tasks;
pub mod users;

pub use agents::AgentFilter;
pub use connection::Database;
pub use tasks::TaskFilter;

/// Page size for "every row". Binds as -1, which SQLite reads as no limit.
pub const NO_LIMIT: usize = usize::MAX;
