//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define dev server metrics (requests, latency, tunnels, builds)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `devserver_requests_total` (counter): requests by method, route, status
//! - `devserver_request_duration_seconds` (histogram): time to response head
//! - `devserver_active_tunnels` (gauge): open WebSocket tunnels
//! - `devserver_builds_total` (counter): builds by outcome
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - Labels for route prefix (or `static`) and status code

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one handled request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("devserver_requests_total", &labels).increment(1);
    metrics::histogram!("devserver_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn tunnel_opened() {
    metrics::gauge!("devserver_active_tunnels").increment(1.0);
}

pub fn tunnel_closed() {
    metrics::gauge!("devserver_active_tunnels").decrement(1.0);
}

/// Record a finished build, `outcome` is `"success"` or `"failure"`.
pub fn record_build(outcome: &'static str) {
    metrics::counter!("devserver_builds_total", "outcome" => outcome).increment(1);
}
