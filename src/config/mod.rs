//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON/TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → build.rs (handler descriptors → handler tree → router)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A handler descriptor is an enum, so "exactly one kind" is enforced
//!   by the parser

pub mod build;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{from_json_str, from_toml_str, load_config, ConfigError};
pub use schema::{
    GatewayConfig, HandlerConfig, ListenerConfig, LogFormat, MatcherConfig, NameValueConfig,
    ObservabilityConfig, RouteConfig, RouterKind, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
