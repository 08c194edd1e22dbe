pub mod types;

pub use types::ManagerError;
