//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Which router dispatches the routes.
    pub router: RouterKind,

    /// Route definitions, in declaration order.
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Timeout configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// How long in-flight requests may run after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 15,
            shutdown_grace_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Router selection.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouterKind {
    /// Pattern table with longest-prefix precedence; uses `matcher.path`.
    #[default]
    Path,
    /// Ordered predicates, first match wins; uses every matcher field.
    Predicate,
}

/// One route: where requests go and what serves them.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteConfig {
    #[serde(default)]
    pub matcher: MatcherConfig,

    pub handler: HandlerConfig,
}

/// Request matching criteria.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct MatcherConfig {
    /// Path pattern (path router) or path template (predicate router).
    pub path: Option<String>,

    /// HTTP method; predicate router only.
    pub method: Option<String>,

    /// Header name/value; predicate router only.
    pub header: Option<NameValueConfig>,

    /// Query parameter name/value; predicate router only.
    pub query: Option<NameValueConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NameValueConfig {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Handler descriptor. Exactly one kind per descriptor.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum HandlerConfig {
    Static {
        #[serde(default)]
        message: String,
    },
    Forward {
        url: String,
        /// Upstream timeout in seconds; 30 when absent.
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    Debug {},
    Echo {},
    NotFound {},
    Chaos {
        handler: Box<HandlerConfig>,
        failure_chance: f64,
        /// Fixed seed for reproducible injection.
        #[serde(default)]
        seed: Option<u64>,
    },
    Fanout {
        handlers: Vec<HandlerConfig>,
        response_strategy: String,
    },
    Retrier {
        handler: Box<HandlerConfig>,
        /// Empty selects the default policy.
        #[serde(default)]
        retry_policy: String,
        #[serde(default)]
        retries: u32,
        /// Backoff between attempts; zero retries back to back.
        #[serde(default)]
        base_delay_ms: u64,
        #[serde(default)]
        max_delay_ms: u64,
    },
}

impl HandlerConfig {
    /// Descriptor kind as written in config.
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerConfig::Static { .. } => "static",
            HandlerConfig::Forward { .. } => "forward",
            HandlerConfig::Debug {} => "debug",
            HandlerConfig::Echo {} => "echo",
            HandlerConfig::NotFound {} => "not_found",
            HandlerConfig::Chaos { .. } => "chaos",
            HandlerConfig::Fanout { .. } => "fanout",
            HandlerConfig::Retrier { .. } => "retrier",
        }
    }
}
