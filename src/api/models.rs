use serde::{Deserialize, Serialize};
use crate::models::User;

pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: User,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn page(&self) -> (usize, usize) {
        (self.limit.unwrap_or(DEFAULT_PAGE_SIZE), self.skip.unwrap_or(0))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AgentListQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub status: Option<String>,
    pub agent_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProgressQuery {
    pub task_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}
