//! Metrics collection and Prometheus export.
//!
//! Recording goes through the `metrics` facade. Before `init_metrics` runs (as in
//! tests) every `record_*` call is a no-op.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. A second call is a no-op.
pub fn init_metrics() -> Result<(), anyhow::Error> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;

    if METRICS_HANDLE.set(handle).is_err() {
        tracing::warn!("Metrics handle already initialized");
    }
    Ok(())
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_provisioning(mode: &'static str, outcome: &'static str) {
    metrics::counter!(
        "provisioning_requests_total",
        "mode" => mode,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_replication(outcome: &'static str, elapsed: Duration) {
    metrics::counter!("replication_calls_total", "outcome" => outcome).increment(1);
    metrics::histogram!("replication_duration_seconds").record(elapsed.as_secs_f64());
}

/// Number of teacher records a single decrypt-and-scan had to examine.
pub fn record_scan_size(candidates: usize) {
    metrics::histogram!("access_code_scan_candidates").record(candidates as f64);
}
