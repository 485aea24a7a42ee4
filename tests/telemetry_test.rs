//! Tests for `metrics`-crate emission.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::time::Duration;

use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use palisade::{CacheConfig, MetricsCollector, MetricsConfig, RequestCache, telemetry};

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn cache_lookups_emit_hit_and_miss_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let cache = RequestCache::new(CacheConfig::default());
        cache.set("k", serde_json::json!(1), None);
        cache.get("k");
        cache.get("k");
        cache.get("absent");
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 2);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 1);
}

#[test]
fn lru_eviction_emits_a_counter() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let cache = RequestCache::new(CacheConfig::new().max_size(1));
        cache.set("a", serde_json::json!(1), None);
        cache.set("b", serde_json::json!(2), None);
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_EVICTIONS_TOTAL), 1);
}

#[test]
fn classified_errors_emit_labeled_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let collector = MetricsCollector::new(MetricsConfig::default());
        collector.record_error("request timeout", "GET", "/repos/a/b");
        collector.record_error("404 not found", "GET", "/repos/a/b");
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::ERRORS_TOTAL), 2);
}

#[test]
fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let cache = RequestCache::new(CacheConfig::default());
    cache.set("k", serde_json::json!(1), None);
    let _ = cache.get("k");

    let collector = MetricsCollector::new(MetricsConfig::default());
    collector.record_error("timeout", "GET", "/x");
    collector.record_rate_limit_delay(Duration::from_millis(5));
}
