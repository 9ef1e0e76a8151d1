//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by method, status, route kind
//! - `relay_request_duration_seconds` (histogram): end-to-end latency
//! - `relay_manifest_lines_rewritten_total` (counter): references rewritten
//! - `relay_rejected_total` (counter): gate rejections by reason
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until a
//!   recorder is installed
//! - Prometheus exposition is opt-in via `observability.metrics_enabled`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape listener. Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, address = %addr, "failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, kind: &'static str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("kind", kind.to_string()),
    ];
    metrics::counter!("relay_requests_total", &labels).increment(1);
    metrics::histogram!("relay_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_manifest_rewrite(lines: usize) {
    metrics::counter!("relay_manifest_lines_rewritten_total").increment(lines as u64);
}

pub fn record_rejected(reason: &'static str) {
    metrics::counter!("relay_rejected_total", "reason" => reason).increment(1);
}
