//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that every route can be dispatched by the selected router
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Handler descriptors are checked by construction, not here
//! - Duplicate path patterns are legal (last wins) and only warned about

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, RouterKind};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid listener.bind_address {0:?}")]
    InvalidBindAddress(String),

    #[error("invalid observability.metrics_address {0:?}")]
    InvalidMetricsAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("listener.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("route {index} has no matcher.path, required by the path router")]
    MissingPath { index: usize },

    #[error("route {index} has an empty matcher.path")]
    EmptyPath { index: usize },
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.router == RouterKind::Path {
        let mut seen = HashSet::new();
        for (index, route) in config.routes.iter().enumerate() {
            match route.matcher.path.as_deref() {
                None => errors.push(ValidationError::MissingPath { index }),
                Some("") => errors.push(ValidationError::EmptyPath { index }),
                Some(path) => {
                    if !seen.insert(path) {
                        tracing::warn!(pattern = path, index, "Duplicate route pattern, later route wins");
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
