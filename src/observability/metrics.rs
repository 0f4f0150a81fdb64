//! Metrics collection and exposition.
//!
//! # Metrics
//! - `store_requests_total` (counter): requests by method, status, route class
//! - `store_request_duration_seconds` (histogram): latency distribution
//! - `store_rate_limited_total` (counter): denials by policy prefix
//! - `store_db_queries_total` (counter) / `store_db_query_duration_seconds` (histogram)
//! - `store_db_pool_leased` (gauge): leased connections after the last acquire

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route_class: &'static str, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!(
        "store_requests_total",
        "method" => method.clone(),
        "status" => status.clone(),
        "class" => route_class
    )
    .increment(1);
    histogram!(
        "store_request_duration_seconds",
        "method" => method,
        "status" => status,
        "class" => route_class
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(policy: &str) {
    counter!("store_rate_limited_total", "policy" => policy.to_string()).increment(1);
}

pub fn record_db_query(duration: Duration, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("store_db_queries_total", "outcome" => outcome).increment(1);
    histogram!("store_db_query_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_pool_acquire(start: Instant, leased: usize) {
    histogram!("store_db_pool_acquire_seconds").record(start.elapsed().as_secs_f64());
    gauge!("store_db_pool_leased").set(leased as f64);
}
