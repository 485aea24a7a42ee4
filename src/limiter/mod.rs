//! Token-bucket admission control reconciled against a remote-reported quota.
//!
//! [`RateLimiter`] gates outbound requests so that neither a locally
//! configured budget nor the remote service's advertised budget is exceeded.
//! The two budgets are tracked independently and never merged: admission
//! requires headroom on *both* tracks, so the limiter always takes the more
//! conservative view.
//!
//! - **Local track** — a classic token bucket (`tokens` / `capacity`),
//!   refilled in proportion to elapsed time within the configured window.
//! - **External track** — the quota the remote service reports about itself
//!   via response headers (`remaining`, `limit`, `reset`), fed back through
//!   [`RateLimiter::update_limits`]. Between header updates the limiter
//!   decrements its external estimate optimistically; the header value is
//!   authoritative and always wins.
//!
//! # Suspension model
//!
//! [`RateLimiter::wait_for_token`] is the only suspension point. When no
//! token is available the caller is parked in a FIFO queue and resumed by a
//! single drain task once quota frees up. Quota exhaustion is never an
//! error — the limiter delays, it does not reject.
//!
//! Internal clocks use [`tokio::time::Instant`], so tests can drive refill
//! and queue behaviour with `tokio::time::pause()` / `advance()`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::telemetry;

/// Hard ceiling on any single admission sleep.
const MAX_WAIT: Duration = Duration::from_secs(60);

/// Floor on any admission sleep, to avoid busy-waiting near a boundary.
const MIN_WAIT: Duration = Duration::from_millis(100);

/// Configuration for the rate limiter.
///
/// ```rust
/// # use palisade::RateLimitConfig;
/// # use std::time::Duration;
/// let config = RateLimitConfig::new()
///     .requests(30)
///     .per(Duration::from_secs(60))
///     .buffer_percentage(0.1);
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests admitted per window. Default: 10.
    pub requests: u32,
    /// Length of the refill window. Default: 1 second.
    pub per: Duration,
    /// Maximum recommended batch size for bulk operations. Default: 5.
    pub burst: u32,
    /// Fraction of the external quota kept as a safety margin. Admission
    /// requires `external.remaining > external.limit * buffer_percentage`.
    /// Default: 0.1.
    pub buffer_percentage: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: 10,
            per: Duration::from_secs(1),
            burst: 5,
            buffer_percentage: 0.1,
        }
    }
}

impl RateLimitConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum requests admitted per window.
    pub fn requests(mut self, n: u32) -> Self {
        self.requests = n;
        self
    }

    /// Set the refill window length.
    pub fn per(mut self, window: Duration) -> Self {
        self.per = window;
        self
    }

    /// Set the maximum recommended batch size.
    pub fn burst(mut self, n: u32) -> Self {
        self.burst = n;
        self
    }

    /// Set the external-quota safety margin fraction.
    pub fn buffer_percentage(mut self, fraction: f64) -> Self {
        self.buffer_percentage = fraction;
        self
    }
}

/// Rate-limit headers as reported by the remote service.
///
/// All fields are raw header strings; unparseable or absent values leave
/// the limiter's previous state untouched (parse-with-fallback). `reset`
/// is a UTC epoch-seconds timestamp, GitHub-style.
#[derive(Debug, Clone, Default)]
pub struct RateLimitHeaders {
    /// `x-ratelimit-remaining` — calls left in the current window.
    pub remaining: Option<String>,
    /// `x-ratelimit-limit` — total quota for the window.
    pub limit: Option<String>,
    /// `x-ratelimit-reset` — epoch seconds at which the quota resets.
    pub reset: Option<String>,
}

impl RateLimitHeaders {
    /// Build from already-parsed numeric values (convenience for tests
    /// and transports that decode headers themselves).
    pub fn from_values(remaining: u32, limit: u32, reset_epoch_secs: u64) -> Self {
        Self {
            remaining: Some(remaining.to_string()),
            limit: Some(limit.to_string()),
            reset: Some(reset_epoch_secs.to_string()),
        }
    }
}

/// Read-only snapshot of both quota tracks, for observability.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimiterStatus {
    /// Locally tracked tokens currently available.
    pub tokens: u32,
    /// Configured local capacity per window.
    pub capacity: u32,
    /// Configured window length in milliseconds.
    pub window_ms: u64,
    /// Remote-reported (or optimistically estimated) remaining quota.
    pub external_remaining: u32,
    /// Remote-reported total quota.
    pub external_limit: u32,
    /// Milliseconds until the remote quota resets (0 if already past).
    pub external_reset_in_ms: u64,
    /// Whether a request would currently be admitted without waiting.
    pub can_make_request: bool,
    /// Number of callers parked in the admission queue.
    pub queued_waiters: usize,
}

/// The remote service's self-reported quota.
///
/// `remaining` is a best-effort estimate between header updates (it is
/// decremented optimistically on each admission); the authoritative value
/// is always whatever the last [`RateLimiter::update_limits`] provided.
#[derive(Debug, Clone)]
struct ExternalQuota {
    remaining: u32,
    limit: u32,
    reset_at: Instant,
}

struct LimiterState {
    tokens: u32,
    last_refill: Instant,
    external: ExternalQuota,
    queue: VecDeque<oneshot::Sender<()>>,
    draining: bool,
}

/// Admission-control gate for outbound API requests.
///
/// Cheaply cloneable; clones share the same underlying state.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Arc<Mutex<LimiterState>>,
}

impl RateLimiter {
    /// Create a limiter with the given configuration. The local bucket
    /// starts full; the external track starts at GitHub's default core
    /// quota (5000/hour) until the first header update arrives.
    pub fn new(config: RateLimitConfig) -> Self {
        let now = Instant::now();
        let state = LimiterState {
            tokens: config.requests,
            last_refill: now,
            external: ExternalQuota {
                remaining: 5000,
                limit: 5000,
                reset_at: now + Duration::from_secs(3600),
            },
            queue: VecDeque::new(),
            draining: false,
        };
        Self {
            config,
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        // Fail-soft on poisoning: the state is plain counters, safe to reuse.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether a request would be admitted right now.
    ///
    /// Refills the local bucket for elapsed time, then requires headroom on
    /// both tracks. No side effects beyond the refill bookkeeping.
    pub fn has_tokens(&self) -> bool {
        let mut s = self.lock();
        s.refill(&self.config, Instant::now());
        s.admissible(&self.config)
    }

    /// Consume one token from the local bucket and optimistically decrement
    /// the external estimate (corrected by the next [`update_limits`]).
    ///
    /// [`update_limits`]: RateLimiter::update_limits
    pub fn consume_token(&self) {
        self.lock().consume();
    }

    /// Wait until a token is available, then consume it.
    ///
    /// Fast path: if a token is available and nobody is queued ahead, the
    /// token is consumed synchronously and the returned delay is zero.
    /// Otherwise the caller is parked in FIFO order and resumed by the
    /// drain task. Returns the delay imposed on this caller, for metrics.
    ///
    /// Dropping the returned future while queued removes the waiter's claim:
    /// the drain task refunds any token it had already assigned to it.
    pub async fn wait_for_token(&self) -> Duration {
        let rx = {
            let mut s = self.lock();
            s.refill(&self.config, Instant::now());
            // Fast path only when no one is queued ahead, to preserve FIFO.
            if s.queue.is_empty() && !s.draining && s.admissible(&self.config) {
                s.consume();
                return Duration::ZERO;
            }
            let (tx, rx) = oneshot::channel();
            s.queue.push_back(tx);
            if !s.draining {
                s.draining = true;
                tokio::spawn(drain_queue(
                    Arc::clone(&self.state),
                    self.config.clone(),
                ));
            }
            rx
        };

        let queued_at = Instant::now();
        // The sender is dropped only by a refunding drain pass; treat either
        // outcome as admission (the drain task has already accounted for us).
        let _ = rx.await;
        let waited = queued_at.elapsed();
        metrics::counter!(telemetry::RATE_LIMIT_WAITS_TOTAL).increment(1);
        metrics::histogram!(telemetry::RATE_LIMIT_WAIT_SECONDS).record(waited.as_secs_f64());
        waited
    }

    /// Overwrite the external track from remote-reported header values.
    ///
    /// Header data is authoritative and always wins over the optimistic
    /// local estimate. Unparseable or missing fields keep the previous
    /// value — a malformed header never corrupts limiter state.
    pub fn update_limits(&self, headers: &RateLimitHeaders) {
        let mut s = self.lock();
        if let Some(remaining) = headers.remaining.as_deref().and_then(parse_count) {
            s.external.remaining = remaining;
        }
        if let Some(limit) = headers.limit.as_deref().and_then(parse_count) {
            s.external.limit = limit;
        }
        if let Some(reset_epoch) = headers.reset.as_deref().and_then(parse_epoch) {
            s.external.reset_at = epoch_to_instant(reset_epoch);
        }
        debug!(
            remaining = s.external.remaining,
            limit = s.external.limit,
            "updated external rate limit from headers"
        );
        if s.external.remaining == 0 {
            warn!("remote-reported quota exhausted; admissions will wait for reset");
        }
    }

    /// Read-only snapshot of both tracks plus queue depth.
    pub fn status(&self) -> RateLimiterStatus {
        let now = Instant::now();
        let mut s = self.lock();
        s.refill(&self.config, now);
        RateLimiterStatus {
            tokens: s.tokens,
            capacity: self.config.requests,
            window_ms: self.config.per.as_millis() as u64,
            external_remaining: s.external.remaining,
            external_limit: s.external.limit,
            external_reset_in_ms: s.external.reset_at.saturating_duration_since(now).as_millis()
                as u64,
            can_make_request: s.admissible(&self.config),
            queued_waiters: s.queue.len(),
        }
    }

    /// Suggest a safe bulk-operation size: 10% of the more restrictive of
    /// the two remaining budgets, capped by the configured `burst`, never
    /// below 1.
    pub fn recommended_batch_size(&self) -> u32 {
        let mut s = self.lock();
        s.refill(&self.config, Instant::now());
        let restrictive = s.tokens.min(s.external.remaining);
        // A zero burst config still yields a usable floor of one.
        (restrictive / 10).clamp(1, self.config.burst.max(1))
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LimiterState {
    /// Time-proportional refill. A full elapsed window resets the bucket;
    /// a partial window adds `floor(elapsed/window * capacity)` tokens.
    /// `last_refill` only advances when tokens were actually added, so
    /// fractional progress is not lost to repeated calls.
    fn refill(&mut self, config: &RateLimitConfig, now: Instant) {
        let elapsed = now.duration_since(self.last_refill);
        if elapsed >= config.per {
            self.tokens = config.requests;
            self.last_refill = now;
        } else {
            let window_ms = config.per.as_millis().max(1) as u64;
            let added = (elapsed.as_millis() as u64)
                .saturating_mul(u64::from(config.requests))
                / window_ms;
            if added > 0 {
                self.tokens = self.tokens.saturating_add(added as u32).min(config.requests);
                self.last_refill = now;
            }
        }
        if now >= self.external.reset_at {
            self.external.remaining = self.external.limit;
        }
    }

    /// Admission requires headroom on both tracks.
    fn admissible(&self, config: &RateLimitConfig) -> bool {
        self.tokens > 0
            && f64::from(self.external.remaining)
                > f64::from(self.external.limit) * config.buffer_percentage
    }

    fn consume(&mut self) {
        self.tokens = self.tokens.saturating_sub(1);
        self.external.remaining = self.external.remaining.saturating_sub(1);
    }

    /// Minimum of three lower-bounded estimates for how long an admission
    /// must wait: local window remainder spread over capacity, external
    /// reset remainder spread over remaining quota, and a hard ceiling.
    /// Floored at 100ms so the drain loop never busy-waits.
    fn wait_time(&self, config: &RateLimitConfig, now: Instant) -> Duration {
        let mut wait = MAX_WAIT;

        let window_end = self.last_refill + config.per;
        let until_window = window_end.saturating_duration_since(now);
        wait = wait.min(until_window / config.requests.max(1));

        // Division by a zero external remainder would be meaningless; in
        // that case only the window estimate and the ceiling apply.
        if self.external.remaining > 0 {
            let until_reset = self.external.reset_at.saturating_duration_since(now);
            wait = wait.min(until_reset / self.external.remaining);
        }

        wait.max(MIN_WAIT)
    }
}

/// Drain parked waiters in FIFO order.
///
/// Exactly one drain task runs per limiter at a time (`draining` flag);
/// it exits once the queue is empty. For each waiter: admit and release
/// if quota allows, otherwise sleep for the calculated wait and retry.
/// A waiter that stopped awaiting gets its token refunded.
async fn drain_queue(state: Arc<Mutex<LimiterState>>, config: RateLimitConfig) {
    loop {
        let next = {
            let mut s = state.lock().unwrap_or_else(|e| e.into_inner());
            s.refill(&config, Instant::now());
            if s.queue.is_empty() {
                s.draining = false;
                return;
            }
            if s.admissible(&config) {
                s.consume();
                s.queue.pop_front()
            } else {
                None
            }
        };

        match next {
            Some(tx) => {
                if tx.send(()).is_err() {
                    // Waiter abandoned the wait; give the token back.
                    let mut s = state.lock().unwrap_or_else(|e| e.into_inner());
                    s.tokens = (s.tokens + 1).min(config.requests);
                    s.external.remaining = (s.external.remaining + 1).min(s.external.limit);
                }
            }
            None => {
                let wait = {
                    let s = state.lock().unwrap_or_else(|e| e.into_inner());
                    s.wait_time(&config, Instant::now())
                };
                debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, delaying admission");
                tokio::time::sleep(wait).await;
            }
        }
    }
}

fn parse_count(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok()
}

fn parse_epoch(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

/// Convert an epoch-seconds reset timestamp to a monotonic deadline.
/// Timestamps in the past map to "now".
fn epoch_to_instant(epoch_secs: u64) -> Instant {
    let now_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let delta = epoch_secs.saturating_sub(now_epoch);
    Instant::now() + Duration::from_secs(delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_count_rejects_garbage() {
        assert_eq!(parse_count("42"), Some(42));
        assert_eq!(parse_count(" 42 "), Some(42));
        assert_eq!(parse_count("forty-two"), None);
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("-1"), None);
    }

    fn future_epoch(secs: u64) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + secs
    }

    #[tokio::test]
    async fn malformed_headers_keep_previous_state() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        // Reset must lie in the future, or the refill inside `status()`
        // legitimately restores `remaining` to `limit` before we look.
        limiter.update_limits(&RateLimitHeaders::from_values(100, 200, future_epoch(3600)));
        limiter.update_limits(&RateLimitHeaders {
            remaining: Some("bogus".into()),
            limit: None,
            reset: Some("also bogus".into()),
        });
        let status = limiter.status();
        assert_eq!(status.external_remaining, 100);
        assert_eq!(status.external_limit, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_time_floors_at_100ms() {
        let config = RateLimitConfig::default();
        let limiter = RateLimiter::new(config.clone());
        let s = limiter.lock();
        // Full bucket, fresh window: the per-token estimate is tiny but
        // must still be floored.
        assert!(s.wait_time(&config, Instant::now()) >= MIN_WAIT);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_time_never_exceeds_ceiling() {
        let config = RateLimitConfig::new().requests(1).per(Duration::from_secs(86_400));
        let limiter = RateLimiter::new(config.clone());
        let s = limiter.lock();
        assert!(s.wait_time(&config, Instant::now()) <= MAX_WAIT);
    }
}
