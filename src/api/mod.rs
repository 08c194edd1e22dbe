pub mod routes;
pub mod models;
pub mod errors;
pub mod auth;

use std::sync::Arc;
use std::time::Duration;
use axum::extract::Request;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Span};
use crate::auth::TokenKeys;
use crate::bridge::{AgentBridge, DetachedBridge, HttpBridge};
use crate::config::ManagerConfig;
use crate::db::Database;
use crate::errors::ManagerError;
use crate::tracker::{ChannelRegistry, StatusTracker};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub tracker: StatusTracker,
    pub keys: TokenKeys,
    pub default_log_limit: usize,
}

impl AppState {
    pub fn new(db: Database, bridge: Arc<dyn AgentBridge>, keys: TokenKeys, default_log_limit: usize) -> Self {
        let tracker = StatusTracker::new(db.clone(), ChannelRegistry::new(), bridge);
        Self { db, tracker, keys, default_log_limit }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        self.tracker.registry()
    }
}

/// Opens the store and picks the bridge backend. `secret` is the resolved
/// signing key.
pub fn create_app_state(config: &ManagerConfig, secret: &str) -> Result<AppState, ManagerError> {
    let db = Database::new(&config.database.path)?;
    let bridge: Arc<dyn AgentBridge> = match &config.bridge.url {
        Some(url) => Arc::new(HttpBridge::new(url, Duration::from_secs(config.bridge.timeout_secs))?),
        None => Arc::new(DetachedBridge),
    };
    info!(database = %config.database.path, bridge = bridge.name(), "Application state ready");

    let keys = TokenKeys::new(secret, config.auth.token_ttl_minutes)?;
    Ok(AppState::new(db, bridge, keys, config.tracking.default_log_limit))
}

/// Request span without the query string, which may carry a websocket token.
fn request_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/users", post(routes::users::create_user).get(routes::users::list_users))
        .route("/api/users/{id}", get(routes::users::get_user).put(routes::users::update_user).delete(routes::users::delete_user))
        .route("/api/agents", post(routes::agents::create_agent).get(routes::agents::list_agents))
        .route("/api/agents/{id}", get(routes::agents::get_agent).put(routes::agents::update_agent).delete(routes::agents::delete_agent))
        .route("/api/agents/{id}/start", post(routes::agents::start_agent))
        .route("/api/agents/{id}/stop", post(routes::agents::stop_agent))
        .route("/api/agents/{id}/pause", post(routes::agents::pause_agent))
        .route("/api/agents/{id}/resume", post(routes::agents::resume_agent))
        .route("/api/agents/{id}/bridge-status", get(routes::agents::bridge_status))
        .route("/api/tasks", post(routes::tasks::create_task).get(routes::tasks::list_tasks))
        .route("/api/tasks/{id}", get(routes::tasks::get_task).put(routes::tasks::update_task).delete(routes::tasks::delete_task))
        .route("/api/tasks/{id}/assign/{agent_id}", post(routes::tasks::assign_task))
        .route("/api/tracking/agents/{id}/logs", get(routes::tracking::agent_logs))
        .route("/api/tracking/tasks/{id}/logs", get(routes::tracking::task_logs))
        .route("/api/tracking/agents/{id}/status/{status}", post(routes::tracking::update_agent_status))
        .route("/api/tracking/tasks/{id}/progress/{progress}", post(routes::tracking::update_task_progress))
        .route("/api/analytics/dashboard", get(routes::analytics::dashboard))
        .route("/api/analytics/agents/stats", get(routes::analytics::agent_stats))
        .route("/api/analytics/tasks/stats", get(routes::analytics::task_stats))
        .route("/api/analytics/agents/{id}/performance", get(routes::analytics::agent_performance))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), auth::require_user));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/tracking/ws", get(routes::tracking::websocket))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_request_span_omits_query() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let request = axum::http::Request::builder()
            .uri("/api/tracking/ws?token=very-secret-token")
            .body(Body::empty())
            .unwrap();
        tracing::subscriber::with_default(subscriber, || {
            let span = request_span(&request);
            let _entered = span.enter();
            info!("handled");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("/api/tracking/ws"), "{}", output);
        assert!(!output.contains("very-secret-token"), "{}", output);
    }
}
