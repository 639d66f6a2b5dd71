//! Pattern-keyed dispatch.
//!
//! Owns the pattern → handler table; [`PathMux`] decides which pattern a
//! request resolves to. Registering a pattern twice replaces its handler.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};

use super::mux::{PathMux, Resolution};
use crate::error::BuildError;
use crate::handler::{http_error, Handler, ResponseSink};

#[derive(Debug, Default)]
pub struct PathRouter {
    bindings: HashMap<String, Box<dyn Handler>>,
    mux: PathMux,
}

impl PathRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(
        &mut self,
        pattern: impl Into<String>,
        handler: Box<dyn Handler>,
    ) -> Result<(), BuildError> {
        let pattern = pattern.into();
        self.mux.register(&pattern)?;
        if self.bindings.insert(pattern.clone(), handler).is_some() {
            tracing::warn!(pattern = %pattern, "Route pattern registered twice, keeping the latest");
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[async_trait]
impl Handler for PathRouter {
    async fn serve(&self, request: Request<Body>, sink: &mut dyn ResponseSink) {
        let handler = match self.mux.resolve(&request) {
            Resolution::Matched(pattern) => self.bindings.get(pattern),
            Resolution::Redirect(location) => {
                match HeaderValue::try_from(location) {
                    Ok(value) => {
                        sink.headers_mut().insert(header::LOCATION, value);
                        http_error(sink, StatusCode::MOVED_PERMANENTLY, "Moved Permanently");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Invalid redirect location");
                        http_error(sink, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
                    }
                }
                return;
            }
            Resolution::NotFound => None,
        };

        match handler {
            Some(handler) => handler.serve(request, sink).await,
            None => http_error(sink, StatusCode::NOT_FOUND, "404 page not found"),
        }
    }
}
