//! In-flight request deduplication.
//!
//! [`RequestDeduplicator`] collapses concurrently-issued identical requests
//! into one execution. The first caller for a fingerprint runs the real
//! call; every caller arriving while it is pending awaits the same shared
//! future and observes the same success value or the same failure.
//!
//! # Coalescing window
//!
//! An entry lives exactly as long as the underlying call is pending. It is
//! removed inside the shared future, before any awaiter observes the
//! result, so an identical request issued the instant after settlement
//! starts a fresh execution rather than reusing a stale result. Result
//! *freshness* across time is the cache's concern, not this component's —
//! the two keep separate maps over the same canonical fingerprint.
//!
//! # The one real concurrency hazard
//!
//! The check-then-register of a fingerprint must be atomic with respect to
//! other identical requests arriving concurrently. Both happen under a
//! single `std::sync::Mutex` acquisition with no `.await` inside, so two
//! tasks can never both miss the map and both invoke the executor.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::debug;

use crate::Result;
use crate::telemetry;
use crate::types::GenerateResponse;

type SharedCall = Shared<BoxFuture<'static, Result<GenerateResponse>>>;

/// Configuration for request deduplication.
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Whether deduplication is active. Default: true.
    pub enabled: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl DedupConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Coalesces concurrent identical requests onto one in-flight execution.
pub struct RequestDeduplicator {
    enabled: bool,
    in_flight: Arc<Mutex<HashMap<String, SharedCall>>>,
}

impl RequestDeduplicator {
    /// Create a new deduplicator with the given configuration.
    pub fn new(config: &DedupConfig) -> Self {
        Self {
            enabled: config.enabled,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Execute `execute` for `fingerprint`, sharing the in-flight call with
    /// any concurrent identical request.
    ///
    /// The executor is invoked exactly once per coalescing window. Each
    /// awaiter independently receives the eventual value — success and
    /// failure alike (which is why [`GarmrError`](crate::GarmrError) is
    /// `Clone`).
    pub async fn deduplicate<F, Fut>(&self, fingerprint: &str, execute: F) -> Result<GenerateResponse>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<GenerateResponse>> + Send + 'static,
    {
        if !self.enabled {
            return execute().await;
        }

        let shared = {
            // No suspension between the lookup and the registration.
            let mut in_flight = self.in_flight.lock().expect("dedup lock poisoned");
            if let Some(pending) = in_flight.get(fingerprint) {
                metrics::counter!(telemetry::DEDUP_COALESCED_TOTAL).increment(1);
                debug!(fingerprint, "coalescing onto in-flight request");
                pending.clone()
            } else {
                let map = Arc::clone(&self.in_flight);
                let key = fingerprint.to_string();
                let call = execute();
                let shared = async move {
                    let result = call.await;
                    // Deregister before any awaiter observes the result, so
                    // a follow-up identical request starts fresh.
                    map.lock().expect("dedup lock poisoned").remove(&key);
                    result
                }
                .boxed()
                .shared();
                in_flight.insert(fingerprint.to_string(), shared.clone());
                shared
            }
        };

        shared.await
    }

    /// Whether a call for `fingerprint` is currently pending.
    pub fn is_in_flight(&self, fingerprint: &str) -> bool {
        self.in_flight
            .lock()
            .expect("dedup lock poisoned")
            .contains_key(fingerprint)
    }

    /// Number of distinct requests currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().expect("dedup lock poisoned").len()
    }

    /// Drop all in-flight registrations.
    ///
    /// Pending calls keep running and their awaiters still get results;
    /// new identical requests simply stop coalescing onto them.
    pub fn clear(&self) {
        self.in_flight.lock().expect("dedup lock poisoned").clear();
    }
}
