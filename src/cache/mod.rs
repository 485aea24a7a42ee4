//! TTL + LRU request cache.
//!
//! [`RequestCache`] avoids redundant upstream calls via a capacity-bounded,
//! time-bounded key/value store. Keys are opaque fingerprints computed by
//! the caller (typically a normalized request signature); values are
//! [`serde_json::Value`] payloads, cloned on the way in and on the way out
//! so neither side can mutate the other's copy through a shared reference.
//!
//! # Eviction
//!
//! Two mechanisms, with TTL taking precedence:
//!
//! - **TTL expiry** — an entry past its `expires_at` is treated as absent.
//!   Expired entries are purged opportunistically (on the access that finds
//!   them) and periodically (a background sweep every `cleanup_interval`).
//! - **LRU eviction** — inserting a brand-new key at `max_size` evicts the
//!   single least-recently-used *live* entry. Expired entries are purged
//!   before the LRU choice is made, so an expired entry is never chosen
//!   over a live one.
//!
//! LRU order is tracked explicitly with a monotonic access sequence per
//! entry rather than relying on map iteration order, so promotion on `get`
//! is exact.
//!
//! # Lifecycle
//!
//! The background sweep is a spawned tokio task holding only a [`Weak`]
//! handle to the store, so dropping the cache stops it on its own; call
//! [`RequestCache::destroy`] for deterministic shutdown (safe to call more
//! than once). Creating the cache outside a tokio runtime simply skips the
//! sweeper — opportunistic purging still keeps reads correct.
//!
//! Cache operations never fail from the caller's point of view: a payload
//! that cannot be serialized for size estimation is stored with a zero
//! estimate rather than rejected.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use crate::telemetry;

/// Configuration for the request cache.
///
/// ```rust
/// # use palisade::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .ttl(Duration::from_secs(600))
///     .max_size(1_000);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Default time-to-live for entries. Default: 5 minutes.
    pub ttl: Duration,
    /// Maximum number of entries before LRU eviction. Default: 500.
    pub max_size: usize,
    /// Background sweep period for expired entries. Default: 60 seconds.
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_size: 500,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default time-to-live for entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the maximum number of entries.
    pub fn max_size(mut self, n: usize) -> Self {
        self.max_size = n;
        self
    }

    /// Set the background sweep period.
    pub fn cleanup_interval(mut self, period: Duration) -> Self {
        self.cleanup_interval = period;
        self
    }
}

/// Counters and size figures for the cache, taken as a point-in-time
/// snapshot. `hit_rate` is recomputed from the raw counters on every read.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    /// LRU evictions only; TTL removals are counted in `expired`.
    pub evictions: u64,
    /// Entries removed because their TTL lapsed.
    pub expired: u64,
    /// Entries currently stored.
    pub size: usize,
    /// Sum of per-entry size estimates, in bytes. Reporting only — plays
    /// no part in eviction decisions.
    pub memory_bytes: usize,
    /// `hits / (hits + misses)`, in [0, 1]. Zero with no traffic.
    pub hit_rate: f64,
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
    /// Monotonic access sequence; the smallest value in the map is the LRU.
    last_access: u64,
    size_estimate: usize,
}

impl CacheEntry {
    fn expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    sets: u64,
    deletes: u64,
    evictions: u64,
    expired: u64,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    access_seq: u64,
    counters: Counters,
}

/// Capacity- and time-bounded key/value store with LRU eviction.
pub struct RequestCache {
    config: CacheConfig,
    inner: Arc<Mutex<CacheInner>>,
    sweeper: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl RequestCache {
    /// Create a cache and start its background sweep.
    ///
    /// When called outside a tokio runtime the sweep is skipped; expired
    /// entries are then only purged on access and explicit [`cleanup`].
    ///
    /// [`cleanup`]: RequestCache::cleanup
    pub fn new(config: CacheConfig) -> Self {
        let inner = Arc::new(Mutex::new(CacheInner {
            entries: HashMap::new(),
            access_seq: 0,
            counters: Counters::default(),
        }));

        let sweeper = tokio::runtime::Handle::try_current()
            .ok()
            .map(|handle| handle.spawn(sweep_loop(Arc::downgrade(&inner), config.cleanup_interval)));

        Self {
            config,
            inner,
            sweeper: Mutex::new(sweeper),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // Fail-soft on poisoning: worst case is a stale entry, which TTL
        // handling already tolerates.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a value. Misses on absent *or* expired keys (expired entries
    /// are deleted on touch). A hit refreshes the entry's recency and
    /// returns the caller its own deep copy of the payload.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut s = self.lock();
        let live = match s.entries.get(key) {
            Some(entry) => !entry.expired(now),
            None => {
                s.counters.misses += 1;
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                return None;
            }
        };
        if !live {
            s.entries.remove(key);
            s.counters.expired += 1;
            s.counters.misses += 1;
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
            return None;
        }
        s.access_seq += 1;
        let seq = s.access_seq;
        let value = s.entries.get_mut(key).map(|entry| {
            entry.last_access = seq;
            entry.value.clone()
        });
        s.counters.hits += 1;
        metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
        value
    }

    /// Store a value under `key`, with an optional per-entry TTL override.
    ///
    /// The value is cloned before storing, so later mutation of the
    /// caller's copy cannot reach the cached one. Inserting a brand-new
    /// key at capacity purges expired entries first, then evicts the
    /// least-recently-used live entry if still full. Never fails.
    pub fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> bool {
        let now = Instant::now();
        let ttl = ttl.unwrap_or(self.config.ttl);
        let size_estimate = serde_json::to_vec(&value).map(|b| b.len()).unwrap_or(0);

        let mut s = self.lock();
        if !s.entries.contains_key(key) && s.entries.len() >= self.config.max_size {
            s.purge_expired(now);
            if s.entries.len() >= self.config.max_size {
                s.evict_lru();
            }
        }
        s.access_seq += 1;
        let entry = CacheEntry {
            value,
            expires_at: now + ttl,
            last_access: s.access_seq,
            size_estimate,
        };
        s.entries.insert(key.to_owned(), entry);
        s.counters.sets += 1;
        true
    }

    /// Existence check with the same expiry semantics as [`get`], but
    /// without refreshing recency.
    ///
    /// [`get`]: RequestCache::get
    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut s = self.lock();
        match s.entries.get(key) {
            Some(entry) if entry.expired(now) => {
                s.entries.remove(key);
                s.counters.expired += 1;
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Remove an entry. Returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        let mut s = self.lock();
        let removed = s.entries.remove(key).is_some();
        if removed {
            s.counters.deletes += 1;
        }
        removed
    }

    /// Remove all entries. Counters are kept.
    pub fn clear(&self) {
        let mut s = self.lock();
        let n = s.entries.len();
        s.entries.clear();
        s.counters.deletes += n as u64;
    }

    /// Evict the least-recently-used entry. No-op on an empty cache.
    pub fn evict_lru(&self) {
        self.lock().evict_lru();
    }

    /// Sweep the whole store, deleting every expired entry. Returns the
    /// number removed. Runs periodically in the background but can be
    /// invoked directly.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut s = self.lock();
        s.purge_expired(now)
    }

    /// All non-expired entries whose key matches `pattern`, for diagnostic
    /// enumeration. Does not refresh recency.
    pub fn get_by_pattern(&self, pattern: &Regex) -> Vec<(String, Value)> {
        let now = Instant::now();
        let s = self.lock();
        s.entries
            .iter()
            .filter(|(key, entry)| !entry.expired(now) && pattern.is_match(key))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Point-in-time snapshot of cache counters and size figures.
    pub fn stats(&self) -> CacheStats {
        let s = self.lock();
        let c = &s.counters;
        let lookups = c.hits + c.misses;
        CacheStats {
            hits: c.hits,
            misses: c.misses,
            sets: c.sets,
            deletes: c.deletes,
            evictions: c.evictions,
            expired: c.expired,
            size: s.entries.len(),
            memory_bytes: s.entries.values().map(|e| e.size_estimate).sum(),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                c.hits as f64 / lookups as f64
            },
        }
    }

    /// Stop the background sweep and drop all entries. Safe to call more
    /// than once; later calls are no-ops.
    pub fn destroy(&self) {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
        self.lock().entries.clear();
    }
}

impl Drop for RequestCache {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for RequestCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CacheInner {
    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.expired(now));
        let removed = before - self.entries.len();
        self.counters.expired += removed as u64;
        if removed > 0 {
            debug!(removed, "purged expired cache entries");
        }
        removed
    }

    /// Remove the entry with the oldest access sequence. Callers purge
    /// expired entries first, so only live entries compete here.
    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
            self.counters.evictions += 1;
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(1);
            debug!(key = %key, "evicted least-recently-used cache entry");
        }
    }
}

/// Periodic expired-entry sweep. Holds only a weak handle so the task
/// winds down on its own once the cache is dropped.
async fn sweep_loop(inner: Weak<Mutex<CacheInner>>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so the first real
    // sweep happens one full period after construction.
    interval.tick().await;
    loop {
        interval.tick().await;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let mut s = inner.lock().unwrap_or_else(|e| e.into_inner());
        s.purge_expired(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn size_estimate_survives_unserializable_depth() {
        // serde_json::Value always serializes, so the estimate is plain;
        // this pins the zero-fallback contract shape instead.
        let cache = RequestCache::new(CacheConfig::default());
        assert!(cache.set("k", json!({"a": 1}), None));
        assert!(cache.stats().memory_bytes > 0);
    }

    #[test]
    fn clear_counts_deletes() {
        let cache = RequestCache::new(CacheConfig::default());
        cache.set("a", json!(1), None);
        cache.set("b", json!(2), None);
        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.deletes, 2);
    }

    #[test]
    fn evict_lru_on_empty_cache_is_noop() {
        let cache = RequestCache::new(CacheConfig::default());
        cache.evict_lru();
        assert_eq!(cache.stats().evictions, 0);
    }
}
