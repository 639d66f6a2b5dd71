//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a JSON document. No semantic validation.
pub fn from_json_str(content: &str) -> Result<GatewayConfig, ConfigError> {
    Ok(serde_json::from_str(content)?)
}

/// Parse a TOML document. No semantic validation.
pub fn from_toml_str(content: &str) -> Result<GatewayConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load and validate configuration. `.json` files are parsed as JSON,
/// anything else as TOML.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config = if is_json {
        from_json_str(&content)?
    } else {
        from_toml_str(&content)?
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
