//! OS signal handling.
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGINT and SIGTERM both mean graceful shutdown
//! - A signal handler that cannot be installed is logged and ignored

use super::Shutdown;

/// Resolve on the first SIGINT (Ctrl+C) or, on Unix, SIGTERM.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "Signal received"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "Signal received"),
    }
}

/// Trigger `shutdown` when a termination signal arrives.
pub fn spawn_signal_listener(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    })
}
