pub mod analytics;
pub mod api;
pub mod auth;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod tracker;
