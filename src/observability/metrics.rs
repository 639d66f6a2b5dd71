//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_chaos_injected_total` (counter): synthetic failures served
//! - `gateway_retries_total` (counter): extra attempts made by retriers
//! - `gateway_upstream_errors_total` (counter): forward failures by kind
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is only installed when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_chaos_injected() {
    counter!("gateway_chaos_injected_total").increment(1);
}

pub fn record_retry() {
    counter!("gateway_retries_total").increment(1);
}

/// `kind` is one of `request`, `timeout` or `body`.
pub fn record_upstream_error(kind: &'static str) {
    counter!("gateway_upstream_errors_total", "kind" => kind).increment(1);
}
