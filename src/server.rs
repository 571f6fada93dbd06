//! Listener setup and the accept loop.
//!
//! Connections are accepted until the shutdown future resolves. Shutdown
//! is abrupt: the listener is dropped and in-flight supervisors go down
//! with the runtime.

use std::future::{Future, IntoFuture};

use tokio::net::TcpListener;
use tracing::info;

use crate::config::{Config, ConfigError};
use crate::routes;
use crate::services::sink::SinkError;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("frame sink unavailable: {0}")]
    Sink(#[from] SinkError),
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: std::io::Error },
    #[error("server failed: {0}")]
    Serve(std::io::Error),
}

/// Bind the configured listen address.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound.
pub async fn bind(config: &Config) -> Result<TcpListener, ServerError> {
    let addr = config.bind_address();
    TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serve websocket connections on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] if the accept loop fails.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send,
{
    let app = routes::app(state);
    tokio::select! {
        result = axum::serve(listener, app).into_future() => result.map_err(ServerError::Serve),
        () = shutdown => {
            info!("shutdown signal received, closing listener");
            Ok(())
        }
    }
}

/// Validate config, build state, bind, and serve until Ctrl-C / SIGTERM.
///
/// # Errors
///
/// Returns the first [`ServerError`] hit during startup or serving.
pub async fn run(config: Config) -> Result<(), ServerError> {
    config.validate()?;
    let state = AppState::from_config(&config).await?;
    let listener = bind(&config).await?;

    let local_addr = listener
        .local_addr()
        .map_or_else(|_| config.bind_address(), |a| a.to_string());
    info!(
        addr = %local_addr,
        interval_secs = config.interval_secs,
        "gesture-bridge listening"
    );

    serve(listener, state, shutdown_signal()).await
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
