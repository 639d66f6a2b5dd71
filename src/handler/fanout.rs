//! Concurrent multi-handler dispatch.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → snapshot body once
//!     → one branch per child, each with its own replay and BufferedResponse
//!     → join all branches (full barrier)
//!     → ResponseStrategy picks one capture, in declared order
//!     → commit it verbatim to the caller's sink
//! ```
//!
//! # Design Decisions
//! - Branches are futures polled together inside the request task, so no
//!   branch outlives the request and dropping the request cancels them all
//! - Selection sees captures in declaration order, not completion order

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::future::join_all;

use super::{http_error, BufferedResponse, Handler, RequestSnapshot, ResponseSink};
use crate::error::BuildError;

/// Chooses the response to commit from every branch's capture.
pub trait ResponseStrategy: Send + Sync + std::fmt::Debug {
    /// `responses` is in declaration order. `None` only for an empty input.
    fn select(&self, responses: Vec<BufferedResponse>) -> Option<BufferedResponse>;
}

/// First 2xx capture, else the first capture.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FirstSuccessful;

impl ResponseStrategy for FirstSuccessful {
    fn select(&self, responses: Vec<BufferedResponse>) -> Option<BufferedResponse> {
        let index = responses
            .iter()
            .position(|r| r.status().is_success())
            .unwrap_or(0);
        responses.into_iter().nth(index)
    }
}

/// Resolve a strategy by its configured name.
pub fn strategy_by_name(name: &str) -> Result<Box<dyn ResponseStrategy>, BuildError> {
    match name {
        "first_successful" => Ok(Box::new(FirstSuccessful)),
        other => Err(BuildError::UnknownResponseStrategy(other.to_string())),
    }
}

#[derive(Debug)]
pub struct FanOutHandler {
    handlers: Vec<Box<dyn Handler>>,
    strategy: Box<dyn ResponseStrategy>,
}

impl FanOutHandler {
    pub fn new(
        handlers: Vec<Box<dyn Handler>>,
        strategy: Box<dyn ResponseStrategy>,
    ) -> Result<Self, BuildError> {
        if handlers.is_empty() {
            return Err(BuildError::EmptyFanOut);
        }
        Ok(Self { handlers, strategy })
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl Handler for FanOutHandler {
    async fn serve(&self, request: Request<Body>, sink: &mut dyn ResponseSink) {
        let snapshot = match RequestSnapshot::capture(request).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read request body");
                http_error(sink, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
                return;
            }
        };

        let branches = self.handlers.iter().map(|handler| {
            let request = snapshot.replay();
            async move {
                let mut buffered = BufferedResponse::new();
                handler.serve(request, &mut buffered).await;
                buffered
            }
        });
        let responses = join_all(branches).await;

        tracing::debug!(
            branches = responses.len(),
            statuses = ?responses.iter().map(|r| r.status().as_u16()).collect::<Vec<_>>(),
            "Fan-out complete"
        );

        match self.strategy.select(responses) {
            Some(selected) => selected.commit(sink),
            None => {
                tracing::error!("Response strategy selected nothing");
                http_error(sink, StatusCode::INTERNAL_SERVER_ERROR, "No handlers configured");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::{get, ScriptedHandler};
    use axum::http::HeaderValue;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[derive(Debug)]
    struct Tagged {
        status: StatusCode,
        tag: &'static str,
        delay: Duration,
    }

    #[async_trait]
    impl Handler for Tagged {
        async fn serve(&self, _request: Request<Body>, sink: &mut dyn ResponseSink) {
            tokio::time::sleep(self.delay).await;
            sink.headers_mut()
                .append("x-branch", HeaderValue::from_static(self.tag));
            sink.set_status(self.status);
            sink.write(self.tag.as_bytes());
        }
    }

    fn tagged(status: u16, tag: &'static str, delay_ms: u64) -> Box<dyn Handler> {
        Box::new(Tagged {
            status: StatusCode::from_u16(status).unwrap(),
            tag,
            delay: Duration::from_millis(delay_ms),
        })
    }

    fn expected(status: u16, tag: &'static str) -> BufferedResponse {
        let mut response = BufferedResponse::new();
        response
            .headers_mut()
            .append("x-branch", HeaderValue::from_static(tag));
        response.set_status(StatusCode::from_u16(status).unwrap());
        response.write(tag.as_bytes());
        response
    }

    #[tokio::test]
    async fn test_invokes_every_branch() {
        let first = ScriptedHandler::new(vec![200]);
        let second = ScriptedHandler::new(vec![200]);
        let (c1, c2) = (first.counter(), second.counter());
        let handler =
            FanOutHandler::new(vec![Box::new(first), Box::new(second)], Box::new(FirstSuccessful))
                .unwrap();

        handler.serve(get("/capture"), &mut BufferedResponse::new()).await;

        assert_eq!(c1.load(Ordering::SeqCst), 1);
        assert_eq!(c2.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_commits_first_successful_verbatim() {
        let handler = FanOutHandler::new(
            vec![tagged(500, "first", 0), tagged(200, "second", 0)],
            Box::new(FirstSuccessful),
        )
        .unwrap();
        let mut sink = BufferedResponse::new();

        handler.serve(get("/"), &mut sink).await;

        assert_eq!(sink, expected(200, "second"));
    }

    #[tokio::test]
    async fn test_falls_back_to_first_branch() {
        let handler = FanOutHandler::new(
            vec![tagged(500, "first", 0), tagged(503, "second", 0)],
            Box::new(FirstSuccessful),
        )
        .unwrap();
        let mut sink = BufferedResponse::new();

        handler.serve(get("/"), &mut sink).await;

        assert_eq!(sink, expected(500, "first"));
    }

    #[tokio::test]
    async fn test_selection_uses_declared_order() {
        // The first declared success finishes last; it must still win.
        let handler = FanOutHandler::new(
            vec![
                tagged(404, "miss", 0),
                tagged(200, "slow", 50),
                tagged(201, "fast", 0),
            ],
            Box::new(FirstSuccessful),
        )
        .unwrap();
        let mut sink = BufferedResponse::new();

        handler.serve(get("/"), &mut sink).await;

        assert_eq!(sink, expected(200, "slow"));
    }

    #[tokio::test]
    async fn test_branches_run_concurrently() {
        let handler = FanOutHandler::new(
            vec![tagged(200, "a", 100), tagged(200, "b", 100), tagged(200, "c", 100)],
            Box::new(FirstSuccessful),
        )
        .unwrap();

        let start = std::time::Instant::now();
        handler.serve(get("/"), &mut BufferedResponse::new()).await;
        assert!(start.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_every_branch_sees_the_body() {
        #[derive(Debug)]
        struct EchoLength;

        #[async_trait]
        impl Handler for EchoLength {
            async fn serve(&self, request: Request<Body>, sink: &mut dyn ResponseSink) {
                let body = crate::handler::read_body(request.into_body()).await.unwrap();
                sink.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                sink.write(body.len().to_string().as_bytes());
            }
        }

        let handler = FanOutHandler::new(
            vec![Box::new(EchoLength), Box::new(EchoLength)],
            Box::new(FirstSuccessful),
        )
        .unwrap();
        let mut sink = BufferedResponse::new();

        handler
            .serve(Request::post("/").body(Body::from("abcdef")).unwrap(), &mut sink)
            .await;

        assert_eq!(sink.body(), b"6");
    }

    #[test]
    fn test_rejects_empty_handler_list() {
        let err = FanOutHandler::new(Vec::new(), Box::new(FirstSuccessful)).unwrap_err();
        assert!(matches!(err, BuildError::EmptyFanOut));
    }

    #[test]
    fn test_strategy_by_name() {
        assert!(strategy_by_name("first_successful").is_ok());
        assert!(matches!(
            strategy_by_name("fastest"),
            Err(BuildError::UnknownResponseStrategy(_))
        ));
    }

    #[test]
    fn test_first_successful_on_empty_input() {
        assert!(FirstSuccessful.select(Vec::new()).is_none());
        let single = vec![BufferedResponse::new()];
        assert!(FirstSuccessful.select(single).is_some());
    }
}
