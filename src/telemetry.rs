//! Telemetry metric name constants.
//!
//! Centralised metric names for palisade operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! These are emitted alongside — not instead of — the in-process counters
//! kept by [`MetricsCollector`](crate::MetricsCollector). The collector
//! answers "how is this client doing right now" queries; the `metrics`
//! constants feed whatever exporter the host process runs.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `palisade_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `method` — HTTP method of the wrapped request
//! - `status` — outcome: "ok" or "error"
//! - `kind` — classified error kind (e.g. "timeout", "rate_limit")

/// Total requests dispatched through the resilient client.
///
/// Labels: `method`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "palisade_requests_total";

/// Request duration in seconds.
///
/// Labels: `method`.
pub const REQUEST_DURATION_SECONDS: &str = "palisade_request_duration_seconds";

/// Total classified errors.
///
/// Labels: `kind`.
pub const ERRORS_TOTAL: &str = "palisade_errors_total";

/// Total request cache hits.
pub const CACHE_HITS_TOTAL: &str = "palisade_cache_hits_total";

/// Total request cache misses.
pub const CACHE_MISSES_TOTAL: &str = "palisade_cache_misses_total";

/// Total request cache evictions (LRU only, not TTL expiry).
pub const CACHE_EVICTIONS_TOTAL: &str = "palisade_cache_evictions_total";

/// Total times a request was delayed by rate-limit admission.
pub const RATE_LIMIT_WAITS_TOTAL: &str = "palisade_rate_limit_waits_total";

/// Time spent waiting for rate-limit admission, in seconds.
pub const RATE_LIMIT_WAIT_SECONDS: &str = "palisade_rate_limit_wait_seconds";
