//! Request/response statistics, error classification, and health scoring.
//!
//! [`MetricsCollector`] passively records events reported by the caller
//! (requests, responses, errors, cache activity, rate-limit delays) and
//! synthesizes derived statistics on demand: success/failure rates, latency
//! aggregates, per-route breakdowns, a single 0–100 health score, and
//! rule-based findings for an alerting layer.
//!
//! Every derived ratio is recomputed from the raw counters on read — the
//! collector never stores a ratio that could drift from its inputs.
//!
//! # Endpoint normalization
//!
//! Per-call metrics keyed on raw URLs would put every request in its own
//! bucket. [`sanitize_endpoint`] collapses variable path segments (numeric
//! IDs, commit SHAs, owner/repo names) into placeholders so the by-endpoint
//! breakdown aggregates by route shape. Sanitization is idempotent.
//!
//! # Error classification
//!
//! [`classify_error`] maps free-text error messages onto the fixed
//! [`ErrorKind`] taxonomy by keyword matching; [`ErrorKind::is_retryable`]
//! derives the retryability signal the caller's retry orchestration keys
//! off. Unrecognized messages fall through to [`ErrorKind::Unknown`] —
//! classification never fails.

use std::collections::{HashMap, VecDeque};
use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tokio::time::Instant;

use crate::telemetry;

/// Configuration for the metrics collector.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Maximum number of events kept in the rolling history buffer.
    /// Oldest events are dropped first. Default: 1000.
    pub history_size: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { history_size: 1000 }
    }
}

impl MetricsConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the history buffer capacity.
    pub fn history_size(mut self, n: usize) -> Self {
        self.history_size = n;
        self
    }
}

/// Classified error taxonomy.
///
/// Only these six-plus-unknown categories are "errors" in the metrics
/// sense; admission delays and cache misses are normal control flow and
/// recorded separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    RateLimit,
    NotFound,
    Authentication,
    Network,
    ServerError,
    Unknown,
}

impl ErrorKind {
    /// Stable label used for metric tags and breakdown keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Network => "network",
            ErrorKind::ServerError => "server_error",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Whether a higher-level retry orchestrator should retry this kind.
    /// Timeouts, rate limits, network blips, and server errors are
    /// transient; the rest are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout
                | ErrorKind::RateLimit
                | ErrorKind::Network
                | ErrorKind::ServerError
        )
    }
}

/// Map a free-text error message onto the [`ErrorKind`] taxonomy.
///
/// Keyword matching is case-insensitive and checked in a fixed order, so
/// a message naming both a timeout and a status code classifies the same
/// way every time. Anything unrecognized is [`ErrorKind::Unknown`].
pub fn classify_error(message: &str) -> ErrorKind {
    let msg = message.to_lowercase();
    if msg.contains("timeout") || msg.contains("timed out") {
        ErrorKind::Timeout
    } else if msg.contains("rate limit") || msg.contains("429") || msg.contains("too many requests")
    {
        ErrorKind::RateLimit
    } else if msg.contains("not found") || msg.contains("404") {
        ErrorKind::NotFound
    } else if msg.contains("unauthorized")
        || msg.contains("authentication")
        || msg.contains("bad credentials")
        || msg.contains("401")
        || msg.contains("403")
    {
        ErrorKind::Authentication
    } else if msg.contains("network")
        || msg.contains("connection")
        || msg.contains("dns")
        || msg.contains("econnreset")
        || msg.contains("econnrefused")
    {
        ErrorKind::Network
    } else if msg.contains("server error")
        || msg.contains("internal")
        || msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
    {
        ErrorKind::ServerError
    } else {
        ErrorKind::Unknown
    }
}

/// Whether a free-text error message describes a retryable condition.
pub fn is_retryable_error(message: &str) -> bool {
    classify_error(message).is_retryable()
}

static SHA_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{7,40}$").expect("static pattern"));
static ID_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("static pattern"));

/// Collapse variable path segments into placeholders so metrics aggregate
/// by route shape rather than by every unique URL.
///
/// - `/repos/<owner>/<repo>/...` → `/repos/{owner}/{repo}/...`
/// - `/users/<name>/...` → `/users/{username}/...`
/// - `/orgs/<name>/...` → `/orgs/{org}/...`
/// - hex segments of 7–40 chars → `{sha}`
/// - all-numeric segments → `{id}`
///
/// Query strings and fragments are stripped. Idempotent: sanitizing an
/// already-sanitized path is a no-op (placeholders contain neither digits
/// nor hex runs, and `{owner}`-style segments re-map to themselves).
pub fn sanitize_endpoint(endpoint: &str) -> String {
    let path = endpoint
        .split(['?', '#'])
        .next()
        .unwrap_or(endpoint);
    let mut out: Vec<String> = Vec::new();
    let mut segments = path.split('/').peekable();
    while let Some(segment) = segments.next() {
        match segment {
            "repos" => {
                out.push("repos".to_owned());
                if segments.next().is_some() {
                    out.push("{owner}".to_owned());
                }
                if segments.next().is_some() {
                    out.push("{repo}".to_owned());
                }
            }
            "users" => {
                out.push("users".to_owned());
                if segments.next().is_some() {
                    out.push("{username}".to_owned());
                }
            }
            "orgs" => {
                out.push("orgs".to_owned());
                if segments.next().is_some() {
                    out.push("{org}".to_owned());
                }
            }
            s if SHA_SEGMENT.is_match(s) => out.push("{sha}".to_owned()),
            s if ID_SEGMENT.is_match(s) => out.push("{id}".to_owned()),
            s => out.push(s.to_owned()),
        }
    }
    out.join("/")
}

/// Discriminant for filtering [`history`](MetricsCollector::history).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Request,
    Response,
    Error,
    CacheHit,
    CacheMiss,
    RateLimitDelay,
}

/// Payload of one recorded event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventData {
    Request {
        method: String,
        endpoint: String,
    },
    Response {
        status: u16,
        latency_ms: u64,
    },
    Error {
        kind: ErrorKind,
        message: String,
        method: String,
        endpoint: String,
    },
    CacheHit,
    CacheMiss,
    RateLimitDelay {
        delay_ms: u64,
    },
}

impl EventData {
    /// The event's filterable kind.
    pub fn kind(&self) -> EventKind {
        match self {
            EventData::Request { .. } => EventKind::Request,
            EventData::Response { .. } => EventKind::Response,
            EventData::Error { .. } => EventKind::Error,
            EventData::CacheHit => EventKind::CacheHit,
            EventData::CacheMiss => EventKind::CacheMiss,
            EventData::RateLimitDelay { .. } => EventKind::RateLimitDelay,
        }
    }
}

/// One entry in the rolling event history.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Milliseconds since the collector was created (or last reset).
    pub offset_ms: u64,
    #[serde(flatten)]
    pub data: EventData,
}

/// Request counters and derived rates.
#[derive(Debug, Clone, Serialize)]
pub struct RequestStats {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    /// Requests per second over the collector's uptime.
    pub per_second: f64,
    /// Successful responses as a percentage of observed responses.
    pub success_rate: f64,
    /// Failed responses as a percentage of observed responses.
    pub failure_rate: f64,
    pub by_method: HashMap<String, u64>,
    pub by_status: HashMap<u16, u64>,
    /// Keyed by sanitized route shape, not raw URL.
    pub by_endpoint: HashMap<String, u64>,
}

/// Latency aggregates over recorded responses.
#[derive(Debug, Clone, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub avg_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
}

/// Classified error counters and derived rate.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorStats {
    pub total: u64,
    /// Errors as a percentage of total requests.
    pub rate: f64,
    pub retryable: u64,
    pub non_retryable: u64,
    /// Keyed by [`ErrorKind::as_str`] labels.
    pub by_kind: HashMap<&'static str, u64>,
}

/// Cache hit/miss counters as reported by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CacheActivityStats {
    pub hits: u64,
    pub misses: u64,
    /// Hits as a percentage of lookups. Zero with no activity.
    pub hit_rate: f64,
}

/// Rate-limit delay counters.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitDelayStats {
    /// Number of requests that had a delay imposed.
    pub delayed: u64,
    pub total_delay_ms: u64,
    pub avg_delay_ms: f64,
}

/// Derived point-in-time view over everything the collector has recorded.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsStats {
    pub uptime_ms: u64,
    pub requests: RequestStats,
    pub latency: LatencyStats,
    pub errors: ErrorStats,
    pub cache: CacheActivityStats,
    pub rate_limit: RateLimitDelayStats,
}

/// Severity of an identified issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// A rule-based finding over the current statistics, for an alerting or
/// operator layer to act on.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
    pub recommendation: String,
}

/// Health score plus findings plus the stats they were derived from.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSummary {
    pub health_score: u8,
    pub issues: Vec<Issue>,
    pub stats: MetricsStats,
}

impl MetricsStats {
    /// Synthesize a single 0–100 well-being score.
    ///
    /// Starts at 100 and subtracts penalties for a success rate below 95%,
    /// average latency above 2000ms (capped at 30 points), and an error
    /// rate above 5% of total requests. Zero-request stats score 100.
    pub fn health_score(&self) -> u8 {
        if self.requests.total == 0 {
            return 100;
        }
        let mut score = 100.0;
        if self.requests.success_rate < 95.0 {
            score -= 2.0 * (95.0 - self.requests.success_rate);
        }
        if self.latency.avg_ms > 2000.0 {
            score -= ((self.latency.avg_ms - 2000.0) / 100.0).min(30.0);
        }
        if self.errors.rate > 5.0 {
            score -= 3.0 * (self.errors.rate - 5.0);
        }
        score.clamp(0.0, 100.0).round() as u8
    }

    /// Rule-based findings over these statistics.
    pub fn issues(&self) -> Vec<Issue> {
        let mut issues = Vec::new();
        if self.requests.total > 0 && self.requests.success_rate < 95.0 {
            issues.push(Issue {
                severity: Severity::High,
                message: format!(
                    "Low success rate: {:.1}% of requests succeeded",
                    self.requests.success_rate
                ),
                recommendation: "Inspect the error breakdown by kind; authentication and \
                                 not-found errors usually indicate a configuration problem."
                    .to_owned(),
            });
        }
        if self.latency.avg_ms > 2000.0 {
            issues.push(Issue {
                severity: Severity::Medium,
                message: format!("Slow average response time: {:.0}ms", self.latency.avg_ms),
                recommendation: "Reduce payload sizes, narrow queries, or raise cache TTLs \
                                 to shift load onto the cache."
                    .to_owned(),
            });
        }
        let cache_activity = self.cache.hits + self.cache.misses;
        if cache_activity > 0 && self.cache.hit_rate < 60.0 {
            issues.push(Issue {
                severity: Severity::Low,
                message: format!("Low cache hit rate: {:.1}%", self.cache.hit_rate),
                recommendation: "Raise cache TTLs or review key construction so repeated \
                                 requests actually share entries."
                    .to_owned(),
            });
        }
        if self.requests.total > 0
            && self.rate_limit.delayed as f64 > self.requests.total as f64 * 0.1
        {
            issues.push(Issue {
                severity: Severity::Medium,
                message: format!(
                    "Frequent rate limiting: {} of {} requests were delayed",
                    self.rate_limit.delayed, self.requests.total
                ),
                recommendation: "Spread bulk operations out, lower the configured request \
                                 rate, or batch calls within the recommended batch size."
                    .to_owned(),
            });
        }
        issues
    }
}

#[derive(Default)]
struct RequestCounters {
    total: u64,
    successful: u64,
    failed: u64,
    by_method: HashMap<String, u64>,
    by_status: HashMap<u16, u64>,
    by_endpoint: HashMap<String, u64>,
}

#[derive(Default)]
struct LatencyCounters {
    count: u64,
    sum_ms: u64,
    min_ms: Option<u64>,
    max_ms: u64,
}

#[derive(Default)]
struct ErrorCounters {
    total: u64,
    retryable: u64,
    non_retryable: u64,
    by_kind: HashMap<ErrorKind, u64>,
}

struct MetricsInner {
    started_at: Instant,
    requests: RequestCounters,
    latency: LatencyCounters,
    errors: ErrorCounters,
    cache_hits: u64,
    cache_misses: u64,
    delayed: u64,
    total_delay_ms: u64,
    history: VecDeque<Event>,
}

impl MetricsInner {
    fn fresh() -> Self {
        Self {
            started_at: Instant::now(),
            requests: RequestCounters::default(),
            latency: LatencyCounters::default(),
            errors: ErrorCounters::default(),
            cache_hits: 0,
            cache_misses: 0,
            delayed: 0,
            total_delay_ms: 0,
            history: VecDeque::new(),
        }
    }

    fn push_event(&mut self, history_size: usize, data: EventData) {
        if history_size == 0 {
            return;
        }
        while self.history.len() >= history_size {
            self.history.pop_front();
        }
        self.history.push_back(Event {
            offset_ms: self.started_at.elapsed().as_millis() as u64,
            data,
        });
    }
}

/// Passive event recorder with derived statistics and health scoring.
///
/// All record operations are infallible and cheap; derived views are
/// computed on demand from the raw counters.
pub struct MetricsCollector {
    config: MetricsConfig,
    inner: Mutex<MetricsInner>,
}

impl MetricsCollector {
    /// Create a collector. Uptime starts now.
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(MetricsInner::fresh()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an outbound request. The endpoint is sanitized before being
    /// counted, so breakdowns aggregate by route shape.
    pub fn record_request(&self, method: &str, endpoint: &str) {
        let route = sanitize_endpoint(endpoint);
        let mut s = self.lock();
        s.requests.total += 1;
        *s.requests.by_method.entry(method.to_uppercase()).or_insert(0) += 1;
        *s.requests.by_endpoint.entry(route.clone()).or_insert(0) += 1;
        s.push_event(
            self.config.history_size,
            EventData::Request {
                method: method.to_uppercase(),
                endpoint: route,
            },
        );
    }

    /// Record a response outcome. Statuses below 400 count as successful.
    pub fn record_response(&self, status: u16, latency: Duration) {
        let latency_ms = latency.as_millis() as u64;
        let mut s = self.lock();
        if status < 400 {
            s.requests.successful += 1;
        } else {
            s.requests.failed += 1;
        }
        *s.requests.by_status.entry(status).or_insert(0) += 1;
        s.latency.count += 1;
        s.latency.sum_ms += latency_ms;
        s.latency.max_ms = s.latency.max_ms.max(latency_ms);
        s.latency.min_ms = Some(s.latency.min_ms.map_or(latency_ms, |m| m.min(latency_ms)));
        s.push_event(
            self.config.history_size,
            EventData::Response { status, latency_ms },
        );
    }

    /// Record and classify an error. Returns the classified kind so the
    /// caller can feed its own retry decision without re-classifying.
    pub fn record_error(&self, message: &str, method: &str, endpoint: &str) -> ErrorKind {
        let kind = classify_error(message);
        metrics::counter!(telemetry::ERRORS_TOTAL, "kind" => kind.as_str()).increment(1);
        let route = sanitize_endpoint(endpoint);
        let mut s = self.lock();
        s.errors.total += 1;
        *s.errors.by_kind.entry(kind).or_insert(0) += 1;
        if kind.is_retryable() {
            s.errors.retryable += 1;
        } else {
            s.errors.non_retryable += 1;
        }
        s.push_event(
            self.config.history_size,
            EventData::Error {
                kind,
                message: message.to_owned(),
                method: method.to_uppercase(),
                endpoint: route,
            },
        );
        kind
    }

    /// Record a request served from cache.
    pub fn record_cache_hit(&self) {
        let mut s = self.lock();
        s.cache_hits += 1;
        s.push_event(self.config.history_size, EventData::CacheHit);
    }

    /// Record a cache lookup that missed.
    pub fn record_cache_miss(&self) {
        let mut s = self.lock();
        s.cache_misses += 1;
        s.push_event(self.config.history_size, EventData::CacheMiss);
    }

    /// Record a delay imposed by rate-limit admission.
    pub fn record_rate_limit_delay(&self, delay: Duration) {
        let delay_ms = delay.as_millis() as u64;
        let mut s = self.lock();
        s.delayed += 1;
        s.total_delay_ms += delay_ms;
        s.push_event(
            self.config.history_size,
            EventData::RateLimitDelay { delay_ms },
        );
    }

    /// Compute the full derived statistics view.
    pub fn stats(&self) -> MetricsStats {
        let s = self.lock();
        let uptime = s.started_at.elapsed();
        let responses = s.requests.successful + s.requests.failed;
        let pct = |part: u64, whole: u64| {
            if whole == 0 {
                0.0
            } else {
                part as f64 / whole as f64 * 100.0
            }
        };
        MetricsStats {
            uptime_ms: uptime.as_millis() as u64,
            requests: RequestStats {
                total: s.requests.total,
                successful: s.requests.successful,
                failed: s.requests.failed,
                per_second: if uptime.as_secs_f64() > 0.0 {
                    s.requests.total as f64 / uptime.as_secs_f64()
                } else {
                    0.0
                },
                success_rate: pct(s.requests.successful, responses),
                failure_rate: pct(s.requests.failed, responses),
                by_method: s.requests.by_method.clone(),
                by_status: s.requests.by_status.clone(),
                by_endpoint: s.requests.by_endpoint.clone(),
            },
            latency: LatencyStats {
                count: s.latency.count,
                avg_ms: if s.latency.count == 0 {
                    0.0
                } else {
                    s.latency.sum_ms as f64 / s.latency.count as f64
                },
                min_ms: s.latency.min_ms.unwrap_or(0),
                max_ms: s.latency.max_ms,
            },
            errors: ErrorStats {
                total: s.errors.total,
                rate: pct(s.errors.total, s.requests.total),
                retryable: s.errors.retryable,
                non_retryable: s.errors.non_retryable,
                by_kind: s
                    .errors
                    .by_kind
                    .iter()
                    .map(|(kind, count)| (kind.as_str(), *count))
                    .collect(),
            },
            cache: CacheActivityStats {
                hits: s.cache_hits,
                misses: s.cache_misses,
                hit_rate: pct(s.cache_hits, s.cache_hits + s.cache_misses),
            },
            rate_limit: RateLimitDelayStats {
                delayed: s.delayed,
                total_delay_ms: s.total_delay_ms,
                avg_delay_ms: if s.delayed == 0 {
                    0.0
                } else {
                    s.total_delay_ms as f64 / s.delayed as f64
                },
            },
        }
    }

    /// Stats plus health score plus findings, in one snapshot.
    pub fn performance_summary(&self) -> PerformanceSummary {
        let stats = self.stats();
        PerformanceSummary {
            health_score: stats.health_score(),
            issues: stats.issues(),
            stats,
        }
    }

    /// The most recent `limit` events in chronological order, optionally
    /// filtered by kind.
    pub fn history(&self, limit: usize, kind: Option<EventKind>) -> Vec<Event> {
        let s = self.lock();
        let mut events: Vec<Event> = s
            .history
            .iter()
            .rev()
            .filter(|event| kind.is_none_or(|k| event.data.kind() == k))
            .take(limit)
            .cloned()
            .collect();
        events.reverse();
        events
    }

    /// Zero all counters and clear the history. Uptime restarts.
    pub fn reset(&self) {
        *self.lock() = MetricsInner::fresh();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_taxonomy() {
        assert_eq!(classify_error("request timeout"), ErrorKind::Timeout);
        assert_eq!(classify_error("API rate limit exceeded"), ErrorKind::RateLimit);
        assert_eq!(classify_error("404 not found"), ErrorKind::NotFound);
        assert_eq!(classify_error("401 unauthorized"), ErrorKind::Authentication);
        assert_eq!(classify_error("connection reset by peer"), ErrorKind::Network);
        assert_eq!(classify_error("502 bad gateway"), ErrorKind::ServerError);
        assert_eq!(classify_error("mysterious failure"), ErrorKind::Unknown);
    }

    #[test]
    fn classification_order_is_fixed() {
        // A message naming both a timeout and a server status classifies
        // as timeout, every time.
        assert_eq!(classify_error("timeout waiting for 503"), ErrorKind::Timeout);
    }

    #[test]
    fn sanitize_repo_routes() {
        assert_eq!(
            sanitize_endpoint("/repos/acme/widgets/issues/482"),
            "/repos/{owner}/{repo}/issues/{id}"
        );
        assert_eq!(
            sanitize_endpoint("/repos/acme/widgets/commits/a1b2c3d4e5f60718293a4b5c6d7e8f9012345678"),
            "/repos/{owner}/{repo}/commits/{sha}"
        );
        assert_eq!(sanitize_endpoint("/users/octocat/repos"), "/users/{username}/repos");
        assert_eq!(sanitize_endpoint("/orgs/acme/members"), "/orgs/{org}/members");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let once = sanitize_endpoint("/repos/acme/widgets/issues/482");
        assert_eq!(sanitize_endpoint(&once), once);
        let once = sanitize_endpoint("/users/octocat/events/12345");
        assert_eq!(sanitize_endpoint(&once), once);
    }

    #[test]
    fn sanitize_strips_query() {
        assert_eq!(
            sanitize_endpoint("/repos/acme/widgets/issues?state=open&page=2"),
            "/repos/{owner}/{repo}/issues"
        );
    }

    #[test]
    fn history_bounds_and_filters() {
        let collector = MetricsCollector::new(MetricsConfig::new().history_size(3));
        collector.record_cache_hit();
        collector.record_cache_miss();
        collector.record_cache_hit();
        collector.record_cache_miss();
        // Oldest dropped first.
        let all = collector.history(10, None);
        assert_eq!(all.len(), 3);
        let hits = collector.history(10, Some(EventKind::CacheHit));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn zero_request_stats_score_perfect() {
        let collector = MetricsCollector::default();
        let stats = collector.stats();
        assert_eq!(stats.health_score(), 100);
        assert!(stats.issues().is_empty());
    }
}
