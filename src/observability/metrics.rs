//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define engine metrics (probes, batches, in-flight checks, severities)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `pulse_probes_total` (counter): completed probes by severity
//! - `pulse_probe_duration_ms` (histogram): probe wall time
//! - `pulse_probes_in_flight` (gauge): probes currently running
//! - `pulse_dispatch_skipped_total` (counter): targets skipped, check already in flight
//! - `pulse_batches_total` (counter): completed batches
//! - `pulse_batch_duration_ms` (histogram): batch wall time
//! - `pulse_target_severity` (gauge): latest severity rank per target (0=OK .. 3=UNREACHABLE)
//! - `pulse_persist_failures_total` (counter): snapshot writes that failed
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

use crate::health::Severity;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_probe(target_id: &str, severity: Severity, elapsed_ms: u64) {
    metrics::counter!("pulse_probes_total", "severity" => severity.as_str()).increment(1);
    metrics::histogram!("pulse_probe_duration_ms").record(elapsed_ms as f64);
    metrics::gauge!("pulse_target_severity", "target" => target_id.to_string())
        .set(f64::from(severity.rank()));
}

pub fn record_in_flight(delta: f64) {
    metrics::gauge!("pulse_probes_in_flight").increment(delta);
}

pub fn record_dispatch_skipped() {
    metrics::counter!("pulse_dispatch_skipped_total").increment(1);
}

pub fn record_batch(dispatched: usize, elapsed: Duration) {
    metrics::counter!("pulse_batches_total").increment(1);
    metrics::histogram!("pulse_batch_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
    tracing::trace!(dispatched, "Batch metrics recorded");
}

pub fn record_persist_failure() {
    metrics::counter!("pulse_persist_failures_total").increment(1);
}
