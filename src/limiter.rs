//! Token-bucket admission control.
//!
//! [`RateLimiter`] bounds the rate of calls reaching the transport. Refill
//! is a pure function of elapsed wall-clock time, computed lazily on every
//! access — no background ticking, which keeps all state transitions
//! deterministic under a paused test clock.
//!
//! [`acquire`](RateLimiter::acquire) computes the exact wait for the
//! shortfall, sleeps once, then force-debits. The post-wait debit can
//! drive the token count slightly negative under floating-point rounding;
//! the deficit is repaid by the next refill and is accepted as the
//! latency/precision trade-off of the single-sleep design.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::telemetry;

/// Configuration for the token bucket.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Bucket capacity; hard ceiling enforced on every refill. Default: 10.
    pub max_tokens: f64,
    /// Tokens restored per second. Must be positive. Default: 1.
    pub refill_rate: f64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_tokens: 10.0,
            refill_rate: 1.0,
        }
    }
}

impl RateLimiterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_tokens(mut self, max: f64) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn refill_rate(mut self, per_second: f64) -> Self {
        self.refill_rate = per_second;
        self
    }
}

/// Partial reconfiguration of a live limiter.
#[derive(Debug, Clone, Default)]
pub struct RateLimiterUpdate {
    pub max_tokens: Option<f64>,
    pub refill_rate: Option<f64>,
}

/// Point-in-time view of the bucket.
#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    /// Tokens currently available (after a lazy refill).
    pub available: f64,
    pub max_tokens: f64,
    pub refill_rate: f64,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
    max_tokens: f64,
    refill_rate: f64,
}

impl Bucket {
    /// Credit tokens for the elapsed interval, capped at capacity.
    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    /// Wait needed before `permits` tokens are available. Zero if they
    /// already are.
    fn shortfall_wait(&self, permits: f64) -> Duration {
        if self.tokens >= permits {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((permits - self.tokens) / self.refill_rate)
        }
    }
}

/// Token-bucket rate limiter.
///
/// All bookkeeping happens inside non-suspending critical sections; the
/// only suspension point is the sleep inside [`acquire`](Self::acquire),
/// taken with the lock released. Callers wanting a cancellable wait race
/// `acquire` against their own cancellation signal.
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter starting with a full bucket.
    pub fn new(config: &RateLimiterConfig) -> Self {
        debug_assert!(config.refill_rate > 0.0, "refill rate must be positive");
        Self {
            bucket: Mutex::new(Bucket {
                tokens: config.max_tokens,
                last_refill: Instant::now(),
                max_tokens: config.max_tokens,
                refill_rate: config.refill_rate,
            }),
        }
    }

    /// Attempt to take `permits` tokens without waiting.
    ///
    /// Refills first, then debits iff enough tokens are available;
    /// otherwise leaves the bucket untouched and returns false.
    pub fn try_acquire(&self, permits: f64) -> bool {
        let mut bucket = self.bucket.lock().expect("limiter lock poisoned");
        bucket.refill(Instant::now());
        if bucket.tokens >= permits {
            bucket.tokens -= permits;
            true
        } else {
            metrics::counter!(telemetry::RATE_LIMITED_TOTAL, "outcome" => "rejected").increment(1);
            false
        }
    }

    /// Take `permits` tokens, suspending until they are available.
    ///
    /// Computes the exact wait for the shortfall, sleeps once, then debits
    /// unconditionally. The debit is not clamped at zero.
    pub async fn acquire(&self, permits: f64) {
        let wait = {
            let mut bucket = self.bucket.lock().expect("limiter lock poisoned");
            bucket.refill(Instant::now());
            if bucket.tokens >= permits {
                bucket.tokens -= permits;
                return;
            }
            bucket.shortfall_wait(permits)
        };

        metrics::counter!(telemetry::RATE_LIMITED_TOTAL, "outcome" => "waited").increment(1);
        debug!(wait_ms = wait.as_millis() as u64, "rate limited, waiting for refill");
        tokio::time::sleep(wait).await;

        let mut bucket = self.bucket.lock().expect("limiter lock poisoned");
        bucket.refill(Instant::now());
        bucket.tokens -= permits;
    }

    /// Wait that [`acquire`](Self::acquire) would currently incur for
    /// `permits` tokens, without mutating state.
    pub fn wait_time(&self, permits: f64) -> Duration {
        let bucket = self.bucket.lock().expect("limiter lock poisoned");
        // Project the refill instead of applying it.
        let elapsed = Instant::now().duration_since(bucket.last_refill).as_secs_f64();
        let projected = (bucket.tokens + elapsed * bucket.refill_rate).min(bucket.max_tokens);
        if projected >= permits {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((permits - projected) / bucket.refill_rate)
        }
    }

    /// Current bucket state, after a lazy refill.
    pub fn stats(&self) -> RateLimiterStats {
        let mut bucket = self.bucket.lock().expect("limiter lock poisoned");
        bucket.refill(Instant::now());
        RateLimiterStats {
            available: bucket.tokens,
            max_tokens: bucket.max_tokens,
            refill_rate: bucket.refill_rate,
        }
    }

    /// Restore the bucket to full capacity.
    pub fn reset(&self) {
        let mut bucket = self.bucket.lock().expect("limiter lock poisoned");
        bucket.tokens = bucket.max_tokens;
        bucket.last_refill = Instant::now();
    }

    /// Apply a partial reconfiguration.
    ///
    /// A lowered `max_tokens` takes effect immediately: the balance is
    /// clamped to the new ceiling.
    pub fn set_options(&self, update: RateLimiterUpdate) {
        let mut bucket = self.bucket.lock().expect("limiter lock poisoned");
        bucket.refill(Instant::now());
        if let Some(max) = update.max_tokens {
            bucket.max_tokens = max;
            bucket.tokens = bucket.tokens.min(max);
        }
        if let Some(rate) = update.refill_rate {
            debug_assert!(rate > 0.0, "refill rate must be positive");
            bucket.refill_rate = rate;
        }
    }
}
