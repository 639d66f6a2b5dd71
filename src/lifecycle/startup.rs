//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the handler tree and router from validated configuration
//! - Start the metrics exporter when enabled
//! - Bind the listener and serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last (traffic only when the router is ready)

use thiserror::Error;
use tokio::net::TcpListener;

use super::{signals, Shutdown};
use crate::config::GatewayConfig;
use crate::error::BuildError;
use crate::http::HttpServer;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build router: {0}")]
    Build(#[from] BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Run the gateway described by `config` until SIGINT or SIGTERM.
pub async fn run(config: GatewayConfig) -> Result<(), StartupError> {
    let root = config.build_router()?;
    tracing::info!(
        router = ?config.router,
        routes = config.routes.len(),
        "Router built"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, root);
    let serving = server.run(listener, shutdown.clone());
    signals::spawn_signal_listener(shutdown);

    serving.await.map_err(StartupError::Serve)
}
