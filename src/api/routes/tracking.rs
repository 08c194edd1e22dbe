use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    Extension, Json,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use crate::api::auth::{authenticate, AuthUser};
use crate::api::models::{LogQuery, ProgressQuery, WsQuery};
use crate::api::AppState;
use crate::errors::ManagerError;
use crate::models::{Agent, AgentLog, AgentStatus, Task, TaskLog, TaskStatus};
use crate::tracker::{ChannelRegistry, NotificationChannel};
use super::agents::load_agent;
use super::tasks::load_task;

/// Upgrades to a notification socket. Browsers cannot set headers on
/// websocket requests, so the bearer token travels in the query string.
/// The token is checked before the upgrade handshake.
pub async fn websocket(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ManagerError> {
    let token = query.token
        .ok_or_else(|| ManagerError::Authentication("Missing token".into()))?;
    let user = authenticate(&state, &token)?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };
    let registry = state.registry().clone();
    Ok(ws.on_upgrade(move |socket| serve_socket(socket, registry, user.id)).into_response())
}

async fn serve_socket(socket: WebSocket, registry: ChannelRegistry, user_id: i64) {
    let (channel, mut rx) = NotificationChannel::new();
    let channel_id = channel.id();
    registry.register(user_id, channel);
    info!(user_id, %channel_id, "Notification socket connected");

    let (mut sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to encode notification");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut writer => break,
            msg = stream.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Inbound frames carry no commands
                Some(Ok(_)) => debug!(user_id, "Ignoring inbound websocket frame"),
            },
        }
    }

    writer.abort();
    registry.unregister(user_id, channel_id);
    info!(user_id, %channel_id, "Notification socket closed");
}

pub async fn agent_logs(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<AgentLog>>, ManagerError> {
    load_agent(&state, &caller, id)?;
    let limit = query.limit.unwrap_or(state.default_log_limit);
    Ok(Json(state.tracker.get_agent_logs(id, limit)?))
}

pub async fn task_logs(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<TaskLog>>, ManagerError> {
    load_task(&state, &caller, id)?;
    let limit = query.limit.unwrap_or(state.default_log_limit);
    Ok(Json(state.tracker.get_task_logs(id, limit)?))
}

pub async fn update_agent_status(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path((id, status)): Path<(i64, String)>,
) -> Result<Json<Agent>, ManagerError> {
    let status: AgentStatus = status.parse()?;
    load_agent(&state, &caller, id)?;
    Ok(Json(state.tracker.update_agent_status(id, status)?))
}

pub async fn update_task_progress(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path((id, progress)): Path<(i64, i64)>,
    Query(query): Query<ProgressQuery>,
) -> Result<Json<Task>, ManagerError> {
    let status = query.task_status.as_deref().map(str::parse::<TaskStatus>).transpose()?;
    load_task(&state, &caller, id)?;
    Ok(Json(state.tracker.update_task_progress(id, progress, status)?))
}
