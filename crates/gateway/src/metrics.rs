//! Prometheus metrics for the endpoint layer.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use switchboard_core::{Error, Result};

/// Initialize the Prometheus recorder and return the render handle.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::gateway(format!("failed to install Prometheus recorder: {}", e)))?;
    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// Record one HTTP request (count and latency).
pub fn track_request(method: &str, path: &str, status: u16, latency_sec: f64) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(latency_sec);
}
