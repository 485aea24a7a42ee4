//! Palisade error types
//!
//! The resilience components themselves ([`RateLimiter`](crate::RateLimiter),
//! [`RequestCache`](crate::RequestCache), [`MetricsCollector`](crate::MetricsCollector))
//! are deliberately fail-soft and never return errors. `PalisadeError` exists
//! only at the client/transport seam: transport failures, bad configuration,
//! and JSON handling.

/// Palisade error types
#[derive(Debug, thiserror::Error)]
pub enum PalisadeError {
    // Transport/network errors
    #[error("transport error: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("no transport configured")]
    NoTransport,

    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for Palisade operations
pub type Result<T> = std::result::Result<T, PalisadeError>;
