//! Palisade - client-side resilience layer for rate-limited HTTP APIs
//!
//! Palisade sits between an application and a rate-limited, sometimes
//! unreliable remote API (think GitHub's REST API) and keeps three promises:
//! never exceed the service's quota — the configured one or the one the
//! service reports about itself; avoid redundant network calls by caching
//! recent results; and continuously characterize connection health so
//! callers can react to degradation.
//!
//! Three independent components do the work, and every outbound call
//! passes through all of them:
//!
//! - [`RateLimiter`] — token-bucket admission control reconciled against
//!   the remote-reported quota; callers suspend, never fail, when quota
//!   runs out.
//! - [`RequestCache`] — TTL + LRU store keyed by request fingerprint.
//! - [`MetricsCollector`] — counters, latency aggregates, error
//!   classification, and a 0–100 health score.
//!
//! [`ResilientClient`] wires the triad around an opaque [`Transport`] for
//! callers that want the canonical pipeline; the components are equally
//! usable standalone.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use palisade::{RateLimitConfig, Request, ResilientClient, Transport};
//!
//! # async fn demo(transport: Arc<dyn Transport>) -> palisade::Result<()> {
//! let client = ResilientClient::builder()
//!     .transport(transport)
//!     .rate_limit(RateLimitConfig::new().requests(30))
//!     .build()?;
//!
//! let response = client.execute(&Request::get("/repos/acme/widgets/issues")).await?;
//! println!("status: {}, cached: {}", response.status, response.from_cache);
//! println!("health: {}", client.metrics().stats().health_score());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod limiter;
pub mod metrics;
pub mod telemetry;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheStats, RequestCache};
pub use client::{Request, ResilientClient, ResilientClientBuilder, Response, Transport};
pub use error::{PalisadeError, Result};
pub use limiter::{RateLimitConfig, RateLimitHeaders, RateLimiter, RateLimiterStatus};
// `crate::` disambiguates from the extern `metrics` crate.
pub use crate::metrics::{
    classify_error, is_retryable_error, sanitize_endpoint, ErrorKind, Event, EventData, EventKind,
    Issue, MetricsCollector, MetricsConfig, MetricsStats, PerformanceSummary, Severity,
};
