//! Composable HTTP gateway library.
//!
//! Requests enter a router (path patterns or ordered predicates) that picks
//! one handler tree. Leaves answer directly or proxy upstream; decorators
//! inject faults, retry, or fan out and pick a response.

// Core subsystems
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::{load_config, GatewayConfig, HandlerConfig};
pub use error::BuildError;
pub use handler::{BufferedResponse, Handler, ResponseSink};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{PathRouter, PredicateRouter};
