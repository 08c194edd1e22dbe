pub mod agents;
pub mod analytics;
pub mod auth;
pub mod health;
pub mod tasks;
pub mod tracking;
pub mod users;
