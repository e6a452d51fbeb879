//! Server setup and lifecycle for the bookgraph API.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use config::BookgraphConfig;

use crate::error::{ApiError, Result};
use crate::routes::create_router;
use crate::state::AppState;

/// The bookgraph HTTP server.
pub struct BookgraphServer {
    state: Arc<AppState>,
}

impl BookgraphServer {
    /// Connects all backends and prepares the server.
    pub async fn new(config: BookgraphConfig) -> Result<Self> {
        let state = Arc::new(AppState::connect(config).await?);
        Ok(Self { state })
    }

    /// Creates a server instance from an existing `AppState`.
    pub fn with_state(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Runs the HTTP server.
    ///
    /// Blocks until shut down via Ctrl+C or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = format!(
            "{}:{}",
            self.state.config.server.host, self.state.config.server.port
        )
        .parse()
        .map_err(|e| ApiError::Server(format!("Invalid address: {e}")))?;

        let router = create_router(self.state.clone());

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ApiError::Server(format!("Failed to bind to {addr}: {e}")))?;

        tracing::info!(%addr, "bookgraph server starting");

        // ConnectInfo feeds the rate limiter's per-client key.
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Server(format!("Server error: {e}")))?;

        tracing::info!("bookgraph server stopped");
        Ok(())
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}

/// Signal handler for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        () = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}

/// Entry point for running the server from configuration.
pub async fn run_server(config: BookgraphConfig) -> Result<()> {
    let server = BookgraphServer::new(config).await?;
    server.run().await
}

/// Entry point for running the server from environment variables.
///
/// This is a convenience function for containerized deployments.
pub async fn run_from_env() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = BookgraphConfig::from_env().map_err(|e| ApiError::Server(e.to_string()))?;
    run_server(config).await
}
