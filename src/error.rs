//! Garmr error types

use std::time::Duration;

/// Garmr error types
///
/// The enum is `Clone` so that a single in-flight result can be observed by
/// every caller coalesced onto it by the
/// [`RequestDeduplicator`](crate::dedup::RequestDeduplicator). For the same
/// reason `serde_json` failures are captured as their display string rather
/// than the source error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GarmrError {
    // Transport/status errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Raised by [`CircuitBreaker`](crate::breaker::CircuitBreaker) without
    /// contacting the transport. Carries the remaining cooldown before the
    /// breaker will admit a probe request.
    #[error("circuit open, retry in {retry_in:?}")]
    CircuitOpen { retry_in: Duration },

    // Fallback exhaustion
    #[error("no healthy models available")]
    NoHealthyModels,

    #[error("model not found: {0}")]
    ModelNotFound(String),

    // Streaming errors
    #[error("stream error: {0}")]
    Stream(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("operation not implemented: {0}")]
    NotImplemented(&'static str),

    // Soft errors
    #[error("empty response from model")]
    EmptyResponse,
}

impl GarmrError {
    /// The HTTP-like status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GarmrError::Api { status, .. } => Some(*status),
            GarmrError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether this error should trigger fallback to the next model.
    ///
    /// Client errors (`4xx`) other than 429 are terminal: the request itself
    /// is bad and retrying it against a different model will not help.
    /// Everything else — 5xx, 429, network-level, unclassified — is
    /// eligible. Errors without a recognizable status default to eligible;
    /// the permissive default favors availability over fast-fail.
    pub fn is_fallback_eligible(&self) -> bool {
        match self.status() {
            Some(429) => true,
            Some(status) => !(400..500).contains(&status),
            None => true,
        }
    }

    /// Provider-suggested retry delay, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GarmrError::RateLimited { retry_after } => *retry_after,
            GarmrError::CircuitOpen { retry_in } => Some(*retry_in),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GarmrError {
    fn from(err: serde_json::Error) -> Self {
        GarmrError::Json(err.to_string())
    }
}

impl From<std::io::Error> for GarmrError {
    fn from(err: std::io::Error) -> Self {
        GarmrError::Io(err.to_string())
    }
}

/// Result type alias for Garmr operations
pub type Result<T> = std::result::Result<T, GarmrError>;
