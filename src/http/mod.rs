//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request ID, trace span, body limit, timeout
//!     → root handler (a router) writes into a StreamingResponse (sink.rs)
//!     → first flush commits status and headers as the Axum response
//!     → later flushes stream body chunks to the client
//! ```

pub mod server;
pub mod sink;

pub use server::{AppState, HttpServer};
pub use sink::StreamingResponse;
