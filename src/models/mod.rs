pub mod agent;
pub mod log;
pub mod task;
pub mod user;

pub use agent::*;
pub use log::*;
pub use task::*;
pub use user::*;
