//! Gateway binary.
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http server ──▶ router ──▶ handler tree ──▶ upstream (forward)
//!                    (request id,    (path or   (static, echo,
//!                     trace, limit,   predicate) debug, chaos,
//!                     timeout)                   retrier, fanout)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use gateway::config::{load_config, GatewayConfig};
use gateway::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "gateway", version, about = "Composable HTTP gateway")]
struct Cli {
    /// Path to a JSON (.json) or TOML config file. Defaults apply when absent.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("gateway: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        "gateway starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    match gateway::lifecycle::run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "gateway failed");
            ExitCode::FAILURE
        }
    }
}
