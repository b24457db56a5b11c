//! Listener plumbing shared by every service binary mode.

use std::net::SocketAddr;

use axum::Router;
use axum::http::StatusCode;
use tracing::info;

use crate::config::ConfigError;
use crate::upstream::UpstreamError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: std::io::Error },
    #[error("server failed: {0}")]
    Serve(std::io::Error),
    #[error("database init failed: {0}")]
    Database(sqlx::Error),
    #[error("http client init failed: {0}")]
    Client(#[from] UpstreamError),
}

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Bind `addr` and serve `app` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server loop fails.
pub async fn serve(name: &'static str, addr: SocketAddr, app: Router) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!(service = name, %addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;
    info!(service = name, "stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
}
