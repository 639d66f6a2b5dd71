//! In-memory response capture.
//!
//! # Responsibilities
//! - Stand in for the live connection so a decorator can look at what a
//!   child produced before deciding what the caller sees
//! - Replay a captured response into another sink
//!
//! # Design Decisions
//! - Status defaults to 200 and may be overwritten until commit
//! - Headers are appended (multimap), body is append-only
//! - One instance per request or branch, never shared between tasks

use axum::http::{HeaderMap, StatusCode};

use super::ResponseSink;

/// A response captured in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl BufferedResponse {
    /// Create an empty capture with status 200.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Replay status, headers and body into `sink`.
    ///
    /// Headers are appended to whatever the sink already holds.
    pub fn commit(self, sink: &mut dyn ResponseSink) {
        let target = sink.headers_mut();
        for (name, value) in self.headers.iter() {
            target.append(name.clone(), value.clone());
        }
        sink.set_status(self.status);
        sink.write(&self.body);
    }
}

impl ResponseSink for BufferedResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn write(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }
}
