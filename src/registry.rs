//! Keyed get-or-create registry for guard components.
//!
//! [`GuardRegistry`] replaces ad-hoc process-wide singletons with one
//! explicit object: the process entry point constructs it once and passes
//! it (by reference or inside an `Arc`) to every consumer. Named
//! instances — one limiter per endpoint, one breaker per upstream — are
//! entries in the registry's maps with get-or-create semantics, and
//! [`reset`](GuardRegistry::reset) drops them all, which is the escape
//! hatch tests need.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::cache::{CacheConfig, ResponseCache};
use crate::fallback::{FallbackConfig, ModelFallbackManager};
use crate::limiter::{RateLimiter, RateLimiterConfig};
use crate::session::{SessionConfig, SessionManager};

/// Explicit registry of named guard instances.
#[derive(Default)]
pub struct GuardRegistry {
    limiters: Mutex<HashMap<String, Arc<RateLimiter>>>,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
    fallbacks: Mutex<HashMap<String, Arc<ModelFallbackManager>>>,
    caches: Mutex<HashMap<String, Arc<ResponseCache>>>,
    sessions: Mutex<HashMap<String, Arc<SessionManager>>>,
}

impl GuardRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the rate limiter registered under `key`.
    ///
    /// `config` is used only when the instance does not exist yet; an
    /// existing instance keeps its original configuration.
    pub fn limiter(&self, key: &str, config: &RateLimiterConfig) -> Arc<RateLimiter> {
        let mut limiters = self.limiters.lock().expect("registry lock poisoned");
        Arc::clone(
            limiters
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(RateLimiter::new(config))),
        )
    }

    /// Get or create the circuit breaker registered under `key`.
    pub fn breaker(&self, key: &str, config: &CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().expect("registry lock poisoned");
        Arc::clone(
            breakers
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(CircuitBreaker::new(config.clone()))),
        )
    }

    /// Get or create the fallback manager registered under `key`.
    pub fn fallback(&self, key: &str, config: &FallbackConfig) -> Arc<ModelFallbackManager> {
        let mut fallbacks = self.fallbacks.lock().expect("registry lock poisoned");
        Arc::clone(
            fallbacks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(ModelFallbackManager::new(config.clone()))),
        )
    }

    /// Get or create the response cache registered under `key`.
    pub fn cache(&self, key: &str, config: &CacheConfig) -> Arc<ResponseCache> {
        let mut caches = self.caches.lock().expect("registry lock poisoned");
        Arc::clone(
            caches
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(ResponseCache::new(config))),
        )
    }

    /// Get or create the session manager registered under `key`.
    pub fn session_manager(&self, key: &str, config: &SessionConfig) -> Arc<SessionManager> {
        let mut sessions = self.sessions.lock().expect("registry lock poisoned");
        Arc::clone(
            sessions
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(SessionManager::new(config.clone()))),
        )
    }

    /// Drop every registered instance.
    ///
    /// Existing `Arc` handles keep working; the next get-or-create for a
    /// key builds a fresh instance.
    pub fn reset(&self) {
        self.limiters.lock().expect("registry lock poisoned").clear();
        self.breakers.lock().expect("registry lock poisoned").clear();
        self.fallbacks.lock().expect("registry lock poisoned").clear();
        self.caches.lock().expect("registry lock poisoned").clear();
        self.sessions.lock().expect("registry lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_returns_same_instance() {
        let registry = GuardRegistry::new();
        let config = RateLimiterConfig::default();
        let a = registry.limiter("generate", &config);
        let b = registry.limiter("generate", &config);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_keys_are_distinct_instances() {
        let registry = GuardRegistry::new();
        let config = RateLimiterConfig::default();
        let a = registry.limiter("generate", &config);
        let b = registry.limiter("embed", &config);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn reset_forgets_instances() {
        let registry = GuardRegistry::new();
        let config = RateLimiterConfig::default();
        let a = registry.limiter("generate", &config);
        registry.reset();
        let b = registry.limiter("generate", &config);
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
