//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and the HTTP server produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID is set by the HTTP layer and carried in the trace span
//! - Metrics are cheap (atomic increments) and no-ops when disabled

pub mod logging;
pub mod metrics;
