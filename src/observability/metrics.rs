//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): API responses by endpoint, status
//! - `gateway_upstream_duration_seconds` (histogram): successful upstream calls
//! - `gateway_upstream_errors_total` (counter): failed upstream calls
//! - `gateway_rejections_total` (counter): requests stopped by a gate
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exporter serves its own listener

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(endpoint: &'static str, status: u16) {
    counter!(
        "gateway_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_upstream_call(endpoint: &'static str, start: Instant) {
    histogram!("gateway_upstream_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(endpoint: &'static str) {
    counter!("gateway_upstream_errors_total", "endpoint" => endpoint).increment(1);
}

/// `gate` is one of `auth`, `admin_auth`, `maintenance`, `ssl_only`.
pub fn record_rejection(gate: &'static str) {
    counter!("gateway_rejections_total", "gate" => gate).increment(1);
}
