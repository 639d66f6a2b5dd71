//! Construction errors.
//!
//! Every variant is raised while the handler tree or router is being built,
//! never while a request is being served.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid method: {0}")]
    InvalidMethod(String),

    #[error("{0} name is empty")]
    EmptyName(&'static str),

    #[error("invalid header name: {0}")]
    InvalidHeaderName(String),

    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to set up TLS client: {0}")]
    Tls(String),

    #[error("failure chance must be within [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("fanout requires at least one handler")]
    EmptyFanOut,

    #[error("unknown retry policy: {0}")]
    UnknownRetryPolicy(String),

    #[error("unknown response strategy: {0}")]
    UnknownResponseStrategy(String),

    #[error("invalid route pattern: {0:?}")]
    InvalidPattern(String),

    #[error("route {index} needs a path pattern")]
    MissingPattern { index: usize },

    #[error("failed to create handler for route {route}: {source}")]
    Route {
        route: String,
        #[source]
        source: Box<BuildError>,
    },

    #[error("failed to create {context}: {source}")]
    Nested {
        context: String,
        #[source]
        source: Box<BuildError>,
    },
}

impl BuildError {
    /// Wrap `self` with a description of the enclosing descriptor.
    pub fn nested(self, context: impl Into<String>) -> Self {
        BuildError::Nested {
            context: context.into(),
            source: Box::new(self),
        }
    }
}
