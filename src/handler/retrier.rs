//! Bounded retry decorator.
//!
//! Each attempt runs the wrapped handler into a fresh buffer. The first
//! attempt the policy accepts is committed; if none is accepted the last
//! attempt is committed. Earlier attempts are discarded whole.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};

use super::{http_error, BufferedResponse, Handler, RequestSnapshot, ResponseSink};
use crate::observability::metrics;
use crate::resilience::backoff::Backoff;
use crate::resilience::RetryPolicy;

#[derive(Debug)]
pub struct RetrierHandler {
    inner: Box<dyn Handler>,
    policy: Box<dyn RetryPolicy>,
    retries: u32,
    backoff: Backoff,
}

impl RetrierHandler {
    /// Up to `retries + 1` attempts, back to back.
    pub fn new(inner: Box<dyn Handler>, policy: Box<dyn RetryPolicy>, retries: u32) -> Self {
        Self {
            inner,
            policy,
            retries,
            backoff: Backoff::default(),
        }
    }

    /// Sleep with exponential backoff between attempts.
    pub fn with_backoff(mut self, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.backoff = Backoff::exponential(base_delay_ms, max_delay_ms);
        self
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }
}

#[async_trait]
impl Handler for RetrierHandler {
    async fn serve(&self, request: Request<Body>, sink: &mut dyn ResponseSink) {
        let snapshot = match RequestSnapshot::capture(request).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read request body");
                http_error(sink, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
                return;
            }
        };

        let mut attempt: u32 = 0;
        loop {
            let mut buffered = BufferedResponse::new();
            self.inner.serve(snapshot.replay(), &mut buffered).await;

            let exhausted = attempt >= self.retries;
            if exhausted || !self.policy.should_retry(buffered.status(), buffered.headers()) {
                if exhausted && attempt > 0 {
                    tracing::debug!(
                        attempts = attempt + 1,
                        status = %buffered.status(),
                        "Retries exhausted, committing last attempt"
                    );
                }
                buffered.commit(sink);
                return;
            }

            attempt += 1;
            metrics::record_retry();
            let delay = self.backoff.delay(attempt);
            tracing::debug!(
                attempt,
                status = %buffered.status(),
                delay = ?delay,
                "Retrying request"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
