//! Live response sink owned by the transport.
//!
//! # Responsibilities
//! - Hold status and headers until the first flush, then hand them over as
//!   the response head
//! - Carry flushed body bytes to the connection through a bounded channel
//!
//! # Design Decisions
//! - Status and header changes after the head is sent have no effect
//! - A full channel makes `flush` wait for the client to catch up
//! - Once the client is gone, writes are dropped

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use tokio::sync::{mpsc, oneshot};

use crate::handler::ResponseSink;

/// Body chunks that may wait between the handler and the connection.
const CHANNEL_CAPACITY: usize = 16;

/// Status and headers of a committed response.
pub type ResponseHead = (StatusCode, HeaderMap);

#[derive(Debug)]
pub struct StreamingResponse {
    status: StatusCode,
    headers: HeaderMap,
    pending: Vec<u8>,
    head: Option<oneshot::Sender<ResponseHead>>,
    body: mpsc::Sender<Bytes>,
}

impl StreamingResponse {
    /// Create a sink plus the receiving ends for its head and body.
    pub fn channel() -> (Self, oneshot::Receiver<ResponseHead>, mpsc::Receiver<Bytes>) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let sink = Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            pending: Vec::new(),
            head: Some(head_tx),
            body: body_tx,
        };
        (sink, head_rx, body_rx)
    }

    pub fn is_committed(&self) -> bool {
        self.head.is_none()
    }

    /// Flush the rest. A handler that wrote nothing still produces a head.
    pub async fn finish(mut self) {
        self.flush().await;
    }

    fn commit(&mut self) {
        if let Some(head) = self.head.take() {
            let _ = head.send((self.status, std::mem::take(&mut self.headers)));
        }
    }
}

#[async_trait]
impl ResponseSink for StreamingResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn set_status(&mut self, status: StatusCode) {
        if self.is_committed() {
            tracing::debug!(status = status.as_u16(), "Status set after response was committed");
            return;
        }
        self.status = status;
    }

    fn write(&mut self, data: &[u8]) {
        if !self.body.is_closed() {
            self.pending.extend_from_slice(data);
        }
    }

    async fn flush(&mut self) {
        self.commit();
        if self.pending.is_empty() {
            return;
        }
        let chunk = Bytes::from(std::mem::take(&mut self.pending));
        let _ = self.body.send(chunk).await;
    }
}
