use std::path::PathBuf;
use data_encoding::HEXLOWER;
use rand::RngCore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use crate::api;
use crate::cli::commands::ServeArgs;
use crate::config::{load_config, ManagerConfig};
use crate::errors::ManagerError;

pub async fn handle_serve(args: ServeArgs) -> Result<(), ManagerError> {
    let config_path = args.config.as_ref().map(PathBuf::from);
    let config = load_config(config_path.as_deref(), &args.overrides()).await?;
    let secret = resolve_secret(&config);

    let state = api::create_app_state(&config, &secret)?;
    let app = api::build_router(state.clone());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, bridge = state.tracker.bridge_name(), "Listening");

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        signal.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| ManagerError::Internal(format!("Server error: {}", e)))?;

    info!(connected_users = state.registry().user_count(), "Server stopped");
    Ok(())
}

/// Configured secret, or a per-process random one. Tokens signed with a
/// random secret do not survive a restart.
fn resolve_secret(config: &ManagerConfig) -> String {
    match &config.auth.secret_key {
        Some(secret) => secret.clone(),
        None => {
            warn!("No auth.secret_key configured; generating a random one for this process");
            let mut bytes = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut bytes);
            HEXLOWER.encode(&bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_secret_used() {
        let mut config = ManagerConfig::default();
        config.auth.secret_key = Some("configured-secret-value".into());
        assert_eq!(resolve_secret(&config), "configured-secret-value");
    }

    #[test]
    fn test_generated_secret_is_random() {
        let config = ManagerConfig::default();
        let a = resolve_secret(&config);
        let b = resolve_secret(&config);
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
