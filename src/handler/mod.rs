//! Request handler subsystem.
//!
//! # Data Flow
//! ```text
//! Router selects one top-level handler
//!     → leaf.rs (static, echo, debug, not found)
//!     → forward.rs (proxy to an upstream URL)
//!     → chaos.rs (inject a synthetic 500, else pass through)
//!     → retrier.rs (re-run a child into fresh buffers until the policy stops)
//!     → fanout.rs (run all children concurrently, select one response)
//!
//! Every handler writes into a ResponseSink:
//!     live request  → StreamingResponse owned by the transport (http/sink.rs)
//!     decorator     → BufferedResponse owned by the decorator (buffer.rs)
//! ```
//!
//! # Design Decisions
//! - Handlers are immutable after construction and shared across requests
//! - Decorators own their children; the tree is built bottom-up at startup
//! - Per-request state lives in locals and sinks only
//! - Bodies are single-consumption; decorators that invoke a child more than
//!   once snapshot the request first

pub mod buffer;
pub mod chaos;
pub mod fanout;
pub mod forward;
pub mod leaf;
pub mod retrier;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, request::Parts, HeaderMap, HeaderValue, Request, StatusCode};

pub use buffer::BufferedResponse;
pub use chaos::{ChaosHandler, RandomSource, SeededRandom, ThreadRandom};
pub use fanout::{FanOutHandler, FirstSuccessful, ResponseStrategy};
pub use forward::ForwardHandler;
pub use leaf::{DebugHandler, EchoHandler, NotFoundHandler, StaticHandler};
pub use retrier::RetrierHandler;

/// The write side of a response.
#[async_trait]
pub trait ResponseSink: Send {
    /// Header multimap of the response being built.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Set the status code. Last write wins until the response is committed.
    fn set_status(&mut self, status: StatusCode);

    /// Append bytes to the body.
    fn write(&mut self, data: &[u8]);

    /// Push what has been written so far toward the client, committing status
    /// and headers. In-memory sinks have nothing to push.
    async fn flush(&mut self) {}
}

/// A unit that consumes a request and writes a response into a sink.
#[async_trait]
pub trait Handler: Send + Sync + std::fmt::Debug {
    async fn serve(&self, request: Request<Body>, sink: &mut dyn ResponseSink);
}

/// Write a plain-text error response.
pub fn http_error(sink: &mut dyn ResponseSink, status: StatusCode, message: &str) {
    let headers = sink.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    sink.set_status(status);
    sink.write(message.as_bytes());
    sink.write(b"\n");
}

/// Read a request body to the end.
pub async fn read_body(body: Body) -> Result<Bytes, axum::Error> {
    axum::body::to_bytes(body, usize::MAX).await
}

/// A request whose body has been read into memory so it can be replayed.
#[derive(Debug)]
pub struct RequestSnapshot {
    parts: Parts,
    body: Bytes,
}

impl RequestSnapshot {
    /// Consume `request`, reading its body once.
    pub async fn capture(request: Request<Body>) -> Result<Self, axum::Error> {
        let (parts, body) = request.into_parts();
        let body = read_body(body).await?;
        Ok(Self { parts, body })
    }

    /// Build an independent copy of the original request.
    ///
    /// Extensions are not carried over.
    pub fn replay(&self) -> Request<Body> {
        let mut request = Request::new(Body::from(self.body.clone()));
        *request.method_mut() = self.parts.method.clone();
        *request.uri_mut() = self.parts.uri.clone();
        *request.version_mut() = self.parts.version;
        *request.headers_mut() = self.parts.headers.clone();
        request
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Responds with a scripted status sequence; the last status repeats.
    #[derive(Debug)]
    pub struct ScriptedHandler {
        statuses: Vec<StatusCode>,
        body: &'static str,
        invocations: Arc<AtomicUsize>,
    }

    impl ScriptedHandler {
        pub fn new(statuses: Vec<u16>) -> Self {
            Self::with_body(statuses, "")
        }

        pub fn with_body(statuses: Vec<u16>, body: &'static str) -> Self {
            Self {
                statuses: statuses
                    .into_iter()
                    .map(|s| StatusCode::from_u16(s).unwrap())
                    .collect(),
                body,
                invocations: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Shared invocation counter, readable after the handler is moved into a decorator.
        pub fn counter(&self) -> Arc<AtomicUsize> {
            self.invocations.clone()
        }
    }

    #[async_trait]
    impl Handler for ScriptedHandler {
        async fn serve(&self, _request: Request<Body>, sink: &mut dyn ResponseSink) {
            let call = self.invocations.fetch_add(1, Ordering::SeqCst);
            let status = self
                .statuses
                .get(call)
                .or(self.statuses.last())
                .copied()
                .unwrap_or(StatusCode::OK);
            sink.headers_mut()
                .append("x-attempt", HeaderValue::from(call as u64));
            sink.set_status(status);
            sink.write(self.body.as_bytes());
        }
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }
}
