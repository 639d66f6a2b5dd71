//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Retrier attempt finished (buffered status + headers)
//!     → retries.rs (policy: retry or stop)
//!     → backoff.rs (delay before the next attempt, if configured)
//! ```
//!
//! # Design Decisions
//! - Policies are stateless strategy objects shared by all requests
//! - Attempts are bounded by a fixed count, never by the policy alone
//! - Backoff is opt-in; the default is to retry immediately

pub mod backoff;
pub mod retries;

pub use retries::{policy_by_name, Non2xxRetryPolicy, RetryPolicy};
