//! Ordered predicate dispatch.
//!
//! # Responsibilities
//! - Keep (predicate, handler) pairs in registration order
//! - Invoke the handler of the first matching pair
//!
//! # Design Decisions
//! - Duplicates are allowed; later duplicates are unreachable
//! - No fallback: an unmatched request leaves the sink untouched and the
//!   transport's default response applies

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;

use super::predicate::{Predicate, RequestPredicate};
use crate::handler::{Handler, ResponseSink};

#[derive(Debug, Default)]
pub struct PredicateRouter {
    routes: Vec<(RequestPredicate, Box<dyn Handler>)>,
}

impl PredicateRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(&mut self, predicate: RequestPredicate, handler: Box<dyn Handler>) {
        self.routes.push((predicate, handler));
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[async_trait]
impl Handler for PredicateRouter {
    async fn serve(&self, request: Request<Body>, sink: &mut dyn ResponseSink) {
        let matched = self
            .routes
            .iter()
            .position(|(predicate, _)| predicate.matches(&request));

        match matched {
            Some(index) => {
                tracing::trace!(route = index, path = %request.uri().path(), "Predicate route matched");
                self.routes[index].1.serve(request, sink).await;
            }
            None => {
                tracing::debug!(
                    method = %request.method(),
                    path = %request.uri().path(),
                    "No predicate route matched"
                );
            }
        }
    }
}
