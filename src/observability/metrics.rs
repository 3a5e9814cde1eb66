//! Metrics collection and exposition.
//!
//! # Metrics
//! - `interceptor_requests_total` (counter): requests by response source and outcome
//! - `interceptor_request_duration_seconds` (histogram): latency by response source
//! - `interceptor_lifecycle_transitions_total` (counter): transitions by entered state
//! - `interceptor_population_resources` (gauge): resources stored by the last install
//! - `interceptor_buckets_reclaimed_total` (counter): stale buckets deleted
//! - `interceptor_reclaim_failures_total` (counter): stale bucket deletions that failed
//!
//! # Design Decisions
//! - Labels are static strings so recording never allocates
//! - The Prometheus exporter serves its own listener, apart from intercepted traffic

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::LifecycleState;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(source: &'static str, outcome: &'static str, start: Instant) {
    ::metrics::counter!("interceptor_requests_total", "source" => source, "outcome" => outcome)
        .increment(1);
    ::metrics::histogram!("interceptor_request_duration_seconds", "source" => source)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_transition(state: LifecycleState) {
    ::metrics::counter!("interceptor_lifecycle_transitions_total", "state" => state.as_str())
        .increment(1);
}

pub fn record_population(resources: usize) {
    ::metrics::gauge!("interceptor_population_resources").set(resources as f64);
}

pub fn record_reclaim(deleted: usize, failed: usize) {
    ::metrics::counter!("interceptor_buckets_reclaimed_total").increment(deleted as u64);
    ::metrics::counter!("interceptor_reclaim_failures_total").increment(failed as u64);
}
