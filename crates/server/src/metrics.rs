//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the seedsort server:
//! - HTTP request metrics (latency, counts)
//! - Scan status (collected dynamically)
//! - Core tagger metrics, registered from `seedsort_core::metrics`

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tracing::error;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "seedsort_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 60.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("seedsort_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "seedsort_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Scan Status (collected dynamically)
// =============================================================================

/// Scan in progress (1 = scanning, 0 = idle).
pub static SCAN_IN_PROGRESS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "seedsort_scan_in_progress",
        "Whether a full scan is currently running (1) or not (0)",
    )
    .unwrap()
});

/// Configured download clients.
pub static CLIENTS_CONFIGURED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "seedsort_clients_configured",
        "Number of download clients available for scanning",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Scan status
    registry
        .register(Box::new(SCAN_IN_PROGRESS.clone()))
        .unwrap();
    registry
        .register(Box::new(CLIENTS_CONFIGURED.clone()))
        .unwrap();

    // Core metrics (scans, torrents, client writes)
    for metric in seedsort_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the scan service right now.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let scans = state.scans();
    SCAN_IN_PROGRESS.set(if scans.is_scanning() { 1 } else { 0 });
    CLIENTS_CONFIGURED.set(scans.clients().len() as i64);
}
