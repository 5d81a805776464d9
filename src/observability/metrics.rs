//! Metrics collection and exposition.
//!
//! # Metrics
//! - `credit_checks_total` (counter): credit lookups by outcome (hit, miss)
//! - `credit_seeds_total` (counter): batches installed
//! - `credit_evictions_total` (counter): removals by reason
//!   (capacity, exhausted, invalidated)
//! - `credit_cache_entries` (gauge): fingerprints held
//!
//! Updates go through the `metrics` facade and are no-ops until a recorder
//! is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`. Must run inside a Tokio
/// runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_credit_check(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    ::metrics::counter!("credit_checks_total", "outcome" => outcome).increment(1);
}

pub fn record_seed() {
    ::metrics::counter!("credit_seeds_total").increment(1);
}

pub fn record_eviction(reason: &'static str) {
    ::metrics::counter!("credit_evictions_total", "reason" => reason).increment(1);
}

pub fn record_cache_size(entries: usize) {
    ::metrics::gauge!("credit_cache_entries").set(entries as f64);
}

/// Record the outcome of a batched authorization decision.
pub fn record_decision(outcome: &'static str) {
    ::metrics::counter!("credit_decisions_total", "outcome" => outcome).increment(1);
}
