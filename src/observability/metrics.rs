//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_forwarded_requests_total` (counter): calls answered by the backend, by method and status
//! - `gateway_backend_duration_seconds` (histogram): time to backend response headers
//! - `gateway_upstream_errors_total` (counter): calls that never got a backend answer
//! - `gateway_capture_failures_total` (counter): records skipped after a successful call, by stage
//!
//! Without an installed recorder every update is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_forwarded(method: &str, status: u16, backend_wait: Duration) {
    metrics::counter!(
        "gateway_forwarded_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_backend_duration_seconds").record(backend_wait.as_secs_f64());
}

pub fn record_upstream_error(method: &str) {
    metrics::counter!("gateway_upstream_errors_total", "method" => method.to_string()).increment(1);
}

pub fn record_capture_failure(stage: &'static str) {
    metrics::counter!("gateway_capture_failures_total", "stage" => stage).increment(1);
}
