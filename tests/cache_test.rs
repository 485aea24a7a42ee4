//! Tests for [`RequestCache`] — TTL + LRU semantics.
//!
//! The cache clocks on `tokio::time::Instant`, so expiry tests run under
//! paused time and advance the clock explicitly instead of sleeping.

use std::time::Duration;

use regex::Regex;
use serde_json::json;

use palisade::{CacheConfig, RequestCache};

fn small_cache(max_size: usize) -> RequestCache {
    RequestCache::new(
        CacheConfig::new()
            .ttl(Duration::from_secs(60))
            .max_size(max_size)
            .cleanup_interval(Duration::from_secs(3600)),
    )
}

#[tokio::test(start_paused = true)]
async fn miss_on_absent_key() {
    let cache = small_cache(10);
    assert!(cache.get("nope").is_none());
    assert!(!cache.has("nope"));
}

#[tokio::test(start_paused = true)]
async fn set_then_get_round_trips() {
    let cache = small_cache(10);
    cache.set("issues", json!({"open": 3}), None);
    assert_eq!(cache.get("issues"), Some(json!({"open": 3})));
    assert!(cache.has("issues"));
}

#[tokio::test(start_paused = true)]
async fn entry_expires_after_ttl() {
    let cache = small_cache(10);
    cache.set("k", json!("v"), Some(Duration::from_secs(1)));

    tokio::time::advance(Duration::from_millis(1100)).await;
    assert!(cache.get("k").is_none());
    assert!(!cache.has("k"));
    assert_eq!(cache.stats().size, 0);
}

#[tokio::test(start_paused = true)]
async fn per_entry_ttl_overrides_default() {
    let cache = RequestCache::new(
        CacheConfig::new()
            .ttl(Duration::from_secs(1))
            .cleanup_interval(Duration::from_secs(3600)),
    );
    cache.set("long", json!(1), Some(Duration::from_secs(120)));
    cache.set("short", json!(2), None);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(cache.get("long").is_some());
    assert!(cache.get("short").is_none());
}

#[tokio::test(start_paused = true)]
async fn get_promotes_against_lru_eviction() {
    let cache = small_cache(2);
    cache.set("a", json!(1), None);
    cache.set("b", json!(2), None);

    // Touch `a` so `b` becomes the LRU, then overflow.
    assert!(cache.get("a").is_some());
    cache.set("c", json!(3), None);

    assert!(cache.get("a").is_some());
    assert!(cache.get("b").is_none());
    assert!(cache.get("c").is_some());
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test(start_paused = true)]
async fn has_does_not_promote() {
    let cache = small_cache(2);
    cache.set("a", json!(1), None);
    cache.set("b", json!(2), None);

    // `has` must not refresh recency: `a` stays LRU and is evicted.
    assert!(cache.has("a"));
    cache.set("c", json!(3), None);

    assert!(cache.get("a").is_none());
    assert!(cache.get("b").is_some());
}

#[tokio::test(start_paused = true)]
async fn overwriting_existing_key_never_evicts() {
    let cache = small_cache(2);
    cache.set("a", json!(1), None);
    cache.set("b", json!(2), None);
    cache.set("a", json!(10), None);

    assert_eq!(cache.stats().evictions, 0);
    assert_eq!(cache.get("a"), Some(json!(10)));
    assert!(cache.get("b").is_some());
}

#[tokio::test(start_paused = true)]
async fn expired_entries_purged_before_lru_choice() {
    let cache = small_cache(2);
    cache.set("stale", json!(1), Some(Duration::from_secs(1)));
    cache.set("live", json!(2), None);

    tokio::time::advance(Duration::from_secs(2)).await;

    // Capacity pressure removes the expired entry, never the live one.
    cache.set("new", json!(3), None);
    assert!(cache.get("live").is_some());
    assert!(cache.get("new").is_some());
    assert_eq!(cache.stats().evictions, 0);
}

#[tokio::test(start_paused = true)]
async fn stored_value_is_isolated_from_caller() {
    let cache = small_cache(10);
    let mut payload = json!({"labels": ["bug"]});
    cache.set("k", payload.clone(), None);

    // Mutating the caller's copy after `set` must not reach the cache.
    payload["labels"] = json!(["bug", "wontfix"]);
    assert_eq!(cache.get("k"), Some(json!({"labels": ["bug"]})));

    // Mutating a `get` result must not reach the stored entry.
    let mut fetched = cache.get("k").unwrap();
    fetched["labels"] = json!([]);
    assert_eq!(cache.get("k"), Some(json!({"labels": ["bug"]})));
}

#[tokio::test(start_paused = true)]
async fn delete_and_clear() {
    let cache = small_cache(10);
    cache.set("a", json!(1), None);
    cache.set("b", json!(2), None);

    assert!(cache.delete("a"));
    assert!(!cache.delete("a"));
    cache.clear();
    assert_eq!(cache.stats().size, 0);
}

#[tokio::test(start_paused = true)]
async fn cleanup_sweeps_only_expired() {
    let cache = small_cache(10);
    cache.set("e1", json!(1), Some(Duration::from_secs(1)));
    cache.set("e2", json!(2), Some(Duration::from_secs(1)));
    cache.set("live", json!(3), Some(Duration::from_secs(600)));

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.cleanup(), 2);
    assert_eq!(cache.stats().size, 1);
}

#[tokio::test(start_paused = true)]
async fn background_sweep_purges_untouched_entries() {
    let cache = RequestCache::new(
        CacheConfig::new()
            .ttl(Duration::from_secs(1))
            .cleanup_interval(Duration::from_secs(5)),
    );
    cache.set("a", json!(1), None);
    cache.set("b", json!(2), None);

    // Let the sweeper task start and register its interval before the
    // clock moves; a timer created after the advance would fire outside
    // the test window.
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    // Past the TTL and past a sweep period, with no accesses at all.
    tokio::time::advance(Duration::from_secs(6)).await;
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    assert_eq!(cache.stats().size, 0);
    assert_eq!(cache.stats().expired, 2);
}

#[tokio::test(start_paused = true)]
async fn get_by_pattern_skips_expired() {
    let cache = small_cache(10);
    cache.set("GET /repos/acme/widgets", json!(1), None);
    cache.set("GET /repos/acme/gadgets", json!(2), Some(Duration::from_secs(1)));
    cache.set("POST /graphql", json!(3), None);

    tokio::time::advance(Duration::from_secs(2)).await;

    let re = Regex::new(r"^GET /repos/").unwrap();
    let matches = cache.get_by_pattern(&re);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].0, "GET /repos/acme/widgets");
}

#[tokio::test(start_paused = true)]
async fn stats_track_counters_and_memory() {
    let cache = small_cache(10);
    cache.set("a", json!({"n": 1}), None);
    cache.get("a");
    cache.get("missing");

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.sets, 1);
    assert_eq!(stats.size, 1);
    assert!(stats.memory_bytes > 0);
    assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn destroy_is_idempotent() {
    let cache = small_cache(10);
    cache.set("a", json!(1), None);
    cache.destroy();
    assert_eq!(cache.stats().size, 0);
    // A second destroy must be a no-op, not a double-free style hazard.
    cache.destroy();
}

#[test]
fn usable_without_a_runtime() {
    // No tokio runtime: the sweeper is skipped but reads stay correct.
    let cache = small_cache(10);
    cache.set("a", json!(1), None);
    assert!(cache.get("a").is_some());
    cache.destroy();
}
