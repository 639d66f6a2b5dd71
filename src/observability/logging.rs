//! Structured logging.
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level when set
//! - JSON format for production, pretty format for development

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Build the filter: `RUST_LOG` if present, else the configured level.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = env_filter(&config.log_level);
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
    };
    if let Err(e) = result {
        eprintln!("logging already initialised: {e}");
    }
}
