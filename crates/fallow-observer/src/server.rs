//! HTTP server lifecycle.
//!
//! The API lives exactly as long as the tick loop it controls. When a run
//! is attached, [`serve`] shuts down gracefully once the loop has ended and
//! every world's last-seen time has been written, so an operator stop ends
//! the whole process. Without a run it serves until the process exits.

use std::net::SocketAddr;
use std::sync::Arc;

use fallow_core::config::OperatorConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Bind address of the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl From<&OperatorConfig> for ServerConfig {
    fn from(config: &OperatorConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Bind to the configured address and [`serve`] the API.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is invalid or cannot be
/// bound, and [`ServerError::Serve`] on a fatal I/O error while serving.
pub async fn start_server(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;
    info!(%addr, "Operator API listening");
    serve(listener, state).await
}

/// Serve the API on an already bound listener until the attached run ends.
///
/// In-flight requests are allowed to finish before this returns.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] on a fatal I/O error.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServerError> {
    let operator = state.operator_state.clone();
    let router = build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            match operator {
                Some(operator) => {
                    let reason = operator.wait_until_ended().await;
                    info!(?reason, "Tick loop ended, shutting down operator API");
                }
                None => std::future::pending::<()>().await,
            }
        })
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))
}

/// Errors that can occur when starting or running the API server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
