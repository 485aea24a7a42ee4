//! Resilient request pipeline wiring the three core components together.
//!
//! [`ResilientClient`] implements the canonical flow for one logical
//! request against an opaque transport:
//!
//! 1. Compute a cache key and check [`RequestCache`]. On hit, record it
//!    and return the cached payload without touching the network.
//! 2. On miss, ask [`RateLimiter::wait_for_token`] for admission — this is
//!    the only point the caller's task may suspend — and record any delay
//!    imposed.
//! 3. Perform the network operation through the [`Transport`] seam.
//! 4. Report the outcome to [`MetricsCollector`] and feed rate-limit
//!    headers back into the limiter.
//! 5. On cacheable success, store the payload.
//!
//! The resilience layer itself is fail-soft: the only errors `execute`
//! surfaces are the transport's own. Build instances with
//! [`ResilientClient::builder`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::{CacheConfig, RequestCache};
use crate::error::{PalisadeError, Result};
use crate::limiter::{RateLimitConfig, RateLimitHeaders, RateLimiter};
use crate::metrics::{MetricsCollector, MetricsConfig};
use crate::telemetry;

/// One logical request against the remote API.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method, e.g. `"GET"`.
    pub method: String,
    /// Path portion of the URL, e.g. `"/repos/acme/widgets/issues"`.
    pub endpoint: String,
}

impl Request {
    /// Convenience constructor.
    pub fn new(method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Convenience constructor for GET requests.
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new("GET", endpoint)
    }

    /// Cache fingerprint: method plus endpoint. Opaque to the cache; two
    /// requests share an entry exactly when their keys are equal.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method.to_uppercase(), self.endpoint)
    }

    fn is_cacheable(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// One raw response from the transport.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Decoded JSON body.
    pub body: Value,
    /// Rate-limit headers, if the service reported any.
    pub rate_limit: Option<RateLimitHeaders>,
    /// Whether this response was served from the request cache.
    pub from_cache: bool,
}

impl Response {
    fn cached(body: Value) -> Self {
        Self {
            status: 200,
            body,
            rate_limit: None,
            from_cache: true,
        }
    }
}

/// The opaque "perform one HTTP request" boundary.
///
/// Palisade does not define the transport, authentication, or the shape of
/// the remote API — implementors bring their own HTTP stack and hand back
/// the status, body, and any rate-limit headers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, request: &Request) -> Result<Response>;
}

/// Builder for [`ResilientClient`].
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use palisade::{ResilientClient, RateLimitConfig, Transport};
/// # fn demo(transport: Arc<dyn Transport>) -> palisade::Result<()> {
/// let client = ResilientClient::builder()
///     .transport(transport)
///     .rate_limit(RateLimitConfig::new().requests(30))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ResilientClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    rate_limit: RateLimitConfig,
    cache: CacheConfig,
    metrics: MetricsConfig,
}

impl ResilientClientBuilder {
    /// Set the transport that performs the actual HTTP requests. Required.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Override the rate limiter configuration.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Override the request cache configuration.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Override the metrics collector configuration.
    pub fn metrics(mut self, config: MetricsConfig) -> Self {
        self.metrics = config;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`PalisadeError::NoTransport`] if no transport was provided.
    pub fn build(self) -> Result<ResilientClient> {
        let transport = self.transport.ok_or(PalisadeError::NoTransport)?;
        Ok(ResilientClient {
            transport,
            limiter: RateLimiter::new(self.rate_limit),
            cache: RequestCache::new(self.cache),
            metrics: MetricsCollector::new(self.metrics),
        })
    }
}

/// Rate-limited, cached, instrumented wrapper around a [`Transport`].
pub struct ResilientClient {
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    cache: RequestCache,
    metrics: MetricsCollector,
}

impl ResilientClient {
    /// Start building a client.
    pub fn builder() -> ResilientClientBuilder {
        ResilientClientBuilder::default()
    }

    /// Execute one logical request through the full resilience pipeline.
    pub async fn execute(&self, request: &Request) -> Result<Response> {
        let key = request.cache_key();
        if request.is_cacheable() {
            if let Some(body) = self.cache.get(&key) {
                self.metrics.record_cache_hit();
                debug!(key = %key, "request served from cache");
                return Ok(Response::cached(body));
            }
            self.metrics.record_cache_miss();
        }

        let delay = self.limiter.wait_for_token().await;
        if !delay.is_zero() {
            self.metrics.record_rate_limit_delay(delay);
        }

        self.metrics.record_request(&request.method, &request.endpoint);
        let started = Instant::now();
        let outcome = self.transport.call(request).await;
        let latency = started.elapsed();

        match outcome {
            Ok(response) => {
                self.metrics.record_response(response.status, latency);
                metrics::counter!(telemetry::REQUESTS_TOTAL,
                    "method" => request.method.to_uppercase(),
                    "status" => if response.status < 400 { "ok" } else { "error" },
                )
                .increment(1);
                metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
                    "method" => request.method.to_uppercase(),
                )
                .record(latency.as_secs_f64());

                if let Some(headers) = &response.rate_limit {
                    self.limiter.update_limits(headers);
                }
                if request.is_cacheable() && (200..300).contains(&response.status) {
                    self.cache.set(&key, response.body.clone(), None);
                }
                Ok(response)
            }
            Err(err) => {
                self.metrics
                    .record_error(&err.to_string(), &request.method, &request.endpoint);
                metrics::counter!(telemetry::REQUESTS_TOTAL,
                    "method" => request.method.to_uppercase(),
                    "status" => "error",
                )
                .increment(1);
                Err(err)
            }
        }
    }

    /// Execute with a caller-supplied cache TTL override for this request.
    pub async fn execute_with_ttl(&self, request: &Request, ttl: Duration) -> Result<Response> {
        let response = self.execute(request).await?;
        if request.is_cacheable() && !response.from_cache && (200..300).contains(&response.status)
        {
            self.cache
                .set(&request.cache_key(), response.body.clone(), Some(ttl));
        }
        Ok(response)
    }

    /// The admission-control gate, for status snapshots.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The request cache, for stats and explicit invalidation.
    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    /// The metrics collector, for stats, history, and health.
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }
}

impl std::fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient").finish_non_exhaustive()
    }
}
