pub mod commands;
pub mod serve;
pub mod users;

pub use commands::{Cli, Commands};
