//! Metrics collection and exposition.
//!
//! # Metrics
//! - `httpbuf_requests_ingested_total` (counter): inbound requests by outcome
//!   (`queued`, `forwarded`, `rejected`)
//! - `httpbuf_requests_evicted_total` (counter): queued requests dropped to
//!   make room under the `drop_oldest` policy
//! - `httpbuf_replays_total` (counter): replay attempts by outcome
//!   (`delivered`, `rejected`, `unreachable`)
//! - `httpbuf_replay_duration_seconds` (histogram): replay latency
//! - `httpbuf_buffer_depth` (gauge): queued requests
//! - `httpbuf_backend_up` (gauge): 1=up, 0=down
//!
//! Without an installed recorder every call here is a no-op.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_ingested(outcome: &'static str) {
    metrics::counter!("httpbuf_requests_ingested_total", "outcome" => outcome).increment(1);
}

pub fn record_evicted(count: usize) {
    metrics::counter!("httpbuf_requests_evicted_total").increment(count as u64);
}

pub fn record_replay(outcome: &'static str, started: Instant) {
    metrics::counter!("httpbuf_replays_total", "outcome" => outcome).increment(1);
    metrics::histogram!("httpbuf_replay_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn set_buffer_depth(depth: usize) {
    metrics::gauge!("httpbuf_buffer_depth").set(depth as f64);
}

pub fn record_backend_up(up: bool) {
    metrics::gauge!("httpbuf_backend_up").set(if up { 1.0 } else { 0.0 });
}
