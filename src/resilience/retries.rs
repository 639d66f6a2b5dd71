//! Retry policies.
//!
//! # Responsibilities
//! - Classify a buffered response as worth another attempt or final
//!
//! # Design Decisions
//! - Policies are pure: one instance serves every request and may be asked
//!   up to `retries + 1` times per request
//! - Only the status and headers are visible; the body is never inspected

use axum::http::{HeaderMap, StatusCode};

use crate::error::BuildError;

/// Decides whether a captured response should be retried.
pub trait RetryPolicy: Send + Sync + std::fmt::Debug {
    fn should_retry(&self, status: StatusCode, headers: &HeaderMap) -> bool;
}

/// Retries everything outside `[200, 300)`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Non2xxRetryPolicy;

impl RetryPolicy for Non2xxRetryPolicy {
    fn should_retry(&self, status: StatusCode, _headers: &HeaderMap) -> bool {
        !status.is_success()
    }
}

/// Resolve a policy by its configured name. Empty selects the default.
pub fn policy_by_name(name: &str) -> Result<Box<dyn RetryPolicy>, BuildError> {
    match name {
        "" | "non_2xx_retry" => Ok(Box::new(Non2xxRetryPolicy)),
        other => Err(BuildError::UnknownRetryPolicy(other.to_string())),
    }
}
