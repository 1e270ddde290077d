//! Metrics collection and exposition.
//!
//! # Metrics
//! - `balancer_requests_total` (counter): requests by method, status, backend
//! - `balancer_request_duration_seconds` (histogram): forwarding latency
//! - `balancer_backend_healthy` (gauge): 1=healthy, 0=down, per backend
//! - `balancer_pool_backends` (gauge): backends per pool partition

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    metrics::counter!(
        "balancer_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);

    metrics::histogram!("balancer_request_duration_seconds", "backend" => backend.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_backend_health(backend: &str, healthy: bool) {
    metrics::gauge!("balancer_backend_healthy", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_pool_size(healthy: usize, unhealthy: usize) {
    metrics::gauge!("balancer_pool_backends", "state" => "healthy").set(healthy as f64);
    metrics::gauge!("balancer_pool_backends", "state" => "unhealthy").set(unhealthy as f64);
}
