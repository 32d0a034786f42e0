//! Content-addressed response cache with LRU eviction and lazy TTL.
//!
//! [`ResponseCache`] stores prior generation responses keyed on the
//! canonical request digest from [`fingerprint`](crate::fingerprint).
//! Identical requests within the freshness window are served from memory
//! instead of paying for another transport call.
//!
//! # Semantics
//!
//! - Expiry is checked lazily on access; there are no background timers.
//!   A `get` on an expired entry deletes it and reports a miss.
//! - Every hit moves the key to the most-recently-used position. Inserting
//!   into a full cache evicts exactly the least-recently-touched entry
//!   before the new one goes in, so capacity is never exceeded.
//! - Disabling the cache clears its contents immediately; a disabled cache
//!   misses on every `get` and ignores every `set`.
//!
//! The access-order list stays in lock-step with the entry map: every key
//! present exactly once. That invariant is what makes "evict the oldest"
//! a constant decision rather than a scan.
//!
//! # Why not moka
//!
//! The rest of the crate leans on ecosystem crates, but this store's
//! contract pins down *which* entry is evicted and *when* expiry becomes
//! observable. moka's eviction policy is approximate by design and cannot
//! guarantee single-victim oldest-first eviction, so the structure is kept
//! explicit here.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::telemetry;
use crate::types::GenerateResponse;

/// Configuration for the response cache.
///
/// ```rust
/// # use garmr::cache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether the cache is active. Default: true.
    pub enabled: bool,
    /// Maximum number of cached entries. Default: 100.
    pub max_entries: usize,
    /// Default time-to-live for cached entries. Default: 5 minutes.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 100,
            ttl: Duration::from_millis(300_000),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the cache.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the default time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Partial reconfiguration of a live cache.
///
/// Unset fields keep their current value. Shrinking `max_entries` evicts
/// oldest entries until the new bound holds; disabling clears the cache.
#[derive(Debug, Clone, Default)]
pub struct CacheUpdate {
    pub enabled: Option<bool>,
    pub max_entries: Option<usize>,
    pub ttl: Option<Duration>,
}

/// A stored response plus its freshness bookkeeping.
struct Entry {
    value: GenerateResponse,
    stored_at: Instant,
    ttl: Duration,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) > self.ttl
    }
}

struct Inner {
    enabled: bool,
    max_entries: usize,
    default_ttl: Duration,
    entries: HashMap<String, Entry>,
    /// Keys oldest-first; in lock-step with `entries`.
    access_order: VecDeque<String>,
}

impl Inner {
    /// Move `key` to the most-recently-used position.
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
        self.access_order.push_back(key.to_string());
    }

    /// Remove a key from both the map and the order list.
    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
    }

    /// Evict least-recently-touched entries until `entries.len() <= bound`.
    fn evict_to(&mut self, bound: usize) {
        while self.entries.len() > bound {
            let Some(victim) = self.access_order.pop_front() else {
                break;
            };
            self.entries.remove(&victim);
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(1);
        }
    }

    fn check_invariant(&self) {
        debug_assert_eq!(
            self.entries.len(),
            self.access_order.len(),
            "access order out of lock-step with entry map"
        );
    }
}

/// In-memory LRU + TTL cache for generation responses.
///
/// Pure in-memory structure: no operation here can fail. All methods take
/// `&self`; interior state is guarded by a mutex whose critical sections
/// never suspend.
pub struct ResponseCache {
    inner: Mutex<Inner>,
}

impl ResponseCache {
    /// Create a new response cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                enabled: config.enabled,
                max_entries: config.max_entries,
                default_ttl: config.ttl,
                entries: HashMap::new(),
                access_order: VecDeque::new(),
            }),
        }
    }

    /// Look up a cached response.
    ///
    /// Returns `None` on miss, on a disabled cache, or on an expired entry
    /// (which is deleted as a side effect). A hit promotes the key to the
    /// most-recently-used position. Emits cache hit/miss metrics.
    pub fn get(&self, key: &str) -> Option<GenerateResponse> {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        if !inner.enabled {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
            return None;
        }
        let now = Instant::now();
        match inner.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                inner.remove(key);
                inner.check_invariant();
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
            Some(entry) => {
                let value = entry.value.clone();
                inner.touch(key);
                inner.check_invariant();
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(value)
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Insert (or replace) a response under `key`.
    ///
    /// `ttl` overrides the configured default for this entry. Inserting a
    /// new key into a full cache first evicts the least-recently-touched
    /// entry. No-op on a disabled cache.
    pub fn set(&self, key: &str, value: GenerateResponse, ttl: Option<Duration>) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        if !inner.enabled || inner.max_entries == 0 {
            return;
        }
        let ttl = ttl.unwrap_or(inner.default_ttl);
        if !inner.entries.contains_key(key) && inner.entries.len() >= inner.max_entries {
            // Make room for exactly the one incoming entry.
            let bound = inner.max_entries - 1;
            inner.evict_to(bound);
        }
        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
        inner.touch(key);
        inner.check_invariant();
    }

    /// Whether a live (non-expired) entry exists for `key`.
    ///
    /// Expired entries are deleted as a side effect, but recency is not
    /// updated — only `get` counts as a touch.
    pub fn has(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        if !inner.enabled {
            return false;
        }
        let now = Instant::now();
        match inner.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                inner.remove(key);
                inner.check_invariant();
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Sweep out every expired entry. Returns the number removed.
    pub fn cleanup(&self) -> usize {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let now = Instant::now();
        let stale: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            inner.remove(key);
        }
        inner.check_invariant();
        stale.len()
    }

    /// Evict all entries.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.clear();
        inner.access_order.clear();
    }

    /// Number of entries currently in the cache (including not-yet-swept
    /// expired ones).
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a partial reconfiguration.
    ///
    /// Disabling clears existing contents immediately. Shrinking
    /// `max_entries` evicts oldest entries until the new bound holds.
    /// A changed `ttl` applies to subsequent inserts only.
    pub fn set_options(&self, update: CacheUpdate) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        if let Some(enabled) = update.enabled {
            if inner.enabled && !enabled {
                inner.entries.clear();
                inner.access_order.clear();
            }
            inner.enabled = enabled;
        }
        if let Some(max) = update.max_entries {
            inner.max_entries = max;
            inner.evict_to(max);
        }
        if let Some(ttl) = update.ttl {
            inner.default_ttl = ttl;
        }
        inner.check_invariant();
    }
}
