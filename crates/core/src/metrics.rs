//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Scans (count by trigger/result, duration)
//! - Per-torrent outcomes
//! - Tag/category writes against download clients

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts};

// =============================================================================
// Scan Metrics
// =============================================================================

/// Scans total by trigger and result.
pub static SCANS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("seedsort_scans_total", "Total classification scans"),
        &["trigger", "result"], // trigger: "schedule", "manual", "startup"; result: "completed", "cancelled", "failed"
    )
    .unwrap()
});

/// Scan duration in seconds.
pub static SCAN_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "seedsort_scan_duration_seconds",
            "Duration of a full classification scan",
        )
        .buckets(vec![0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
    )
    .unwrap()
});

/// Torrents processed by outcome.
pub static TORRENTS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "seedsort_torrents_processed_total",
            "Torrents processed by scans and events",
        ),
        &["result"], // "tagged", "unchanged", "skipped", "failed"
    )
    .unwrap()
});

// =============================================================================
// Client Write Metrics
// =============================================================================

/// Download client writes by kind and result.
pub static WRITES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "seedsort_writes_total",
            "Tag/category writes issued to download clients",
        ),
        &["kind", "result"], // kind: "tags", "category", "create_category"; result: "success", "failure"
    )
    .unwrap()
});

/// Record a write outcome.
pub(crate) fn record_write<T, E>(kind: &str, result: &Result<T, E>) {
    let outcome = if result.is_ok() { "success" } else { "failure" };
    WRITES_TOTAL.with_label_values(&[kind, outcome]).inc();
}

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SCANS_TOTAL.clone()),
        Box::new(SCAN_DURATION.clone()),
        Box::new(TORRENTS_PROCESSED.clone()),
        Box::new(WRITES_TOTAL.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        SCANS_TOTAL.with_label_values(&["manual", "completed"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "seedsort_scans_total"));
    }

    #[test]
    fn test_record_write() {
        let before = WRITES_TOTAL.with_label_values(&["probe", "failure"]).get();
        record_write::<(), &str>("probe", &Err("boom"));
        let after = WRITES_TOTAL.with_label_values(&["probe", "failure"]).get();
        assert_eq!(after, before + 1);
    }
}
