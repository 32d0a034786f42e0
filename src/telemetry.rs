//! Telemetry metric name constants.
//!
//! Centralised metric names for garmr operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `garmr_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `model` — model identifier the request targeted
//! - `operation` — capability invoked (e.g. "generate", "generate_stream")
//! - `status` — outcome: "ok" or "error"

/// Total generation requests dispatched through the caching decorator.
///
/// Labels: `operation`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "garmr_requests_total";

/// Request duration in seconds, measured around the wrapped generator.
///
/// Labels: `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "garmr_request_duration_seconds";

/// Total response cache hits.
pub const CACHE_HITS_TOTAL: &str = "garmr_cache_hits_total";

/// Total response cache misses.
pub const CACHE_MISSES_TOTAL: &str = "garmr_cache_misses_total";

/// Total cache evictions (capacity pressure, not TTL expiry).
pub const CACHE_EVICTIONS_TOTAL: &str = "garmr_cache_evictions_total";

/// Total requests coalesced onto an already in-flight execution.
pub const DEDUP_COALESCED_TOTAL: &str = "garmr_dedup_coalesced_total";

/// Total acquisitions rejected or delayed by the rate limiter.
///
/// Labels: `outcome` ("rejected" | "waited").
pub const RATE_LIMITED_TOTAL: &str = "garmr_rate_limited_total";

/// Total circuit breaker state transitions.
///
/// Labels: `from`, `to` (lowercase state names).
pub const BREAKER_TRANSITIONS_TOTAL: &str = "garmr_breaker_transitions_total";

/// Total requests rejected while the circuit was open.
pub const BREAKER_REJECTED_TOTAL: &str = "garmr_breaker_rejected_total";

/// Total times execution fell through to a lower-priority model.
///
/// Labels: `from_model`.
pub const FALLBACK_SWITCHES_TOTAL: &str = "garmr_fallback_switches_total";

/// Total history compressions performed.
pub const COMPRESSIONS_TOTAL: &str = "garmr_compressions_total";
