//! Environment-derived configuration for the caching decorator.
//!
//! Recognized variables, all optional:
//!
//! | variable | default | meaning |
//! |---|---|---|
//! | `GARMR_CACHE_ENABLED` | `true` | response cache on/off |
//! | `GARMR_CACHE_TTL_MS` | `300000` | cache entry time-to-live |
//! | `GARMR_CACHE_MAX_ENTRIES` | `100` | cache capacity |
//! | `GARMR_DEDUP_ENABLED` | `true` | in-flight deduplication on/off |
//!
//! Every field is also overridable per-instance by constructing the
//! config structs directly; the environment only seeds defaults.
//! Unparseable values fall back to the default with a warning.

use std::time::Duration;

use tracing::warn;

use crate::cache::CacheConfig;
use crate::dedup::DedupConfig;

pub const ENV_CACHE_ENABLED: &str = "GARMR_CACHE_ENABLED";
pub const ENV_CACHE_TTL_MS: &str = "GARMR_CACHE_TTL_MS";
pub const ENV_CACHE_MAX_ENTRIES: &str = "GARMR_CACHE_MAX_ENTRIES";
pub const ENV_DEDUP_ENABLED: &str = "GARMR_DEDUP_ENABLED";

/// Combined configuration for
/// [`CachingContentGenerator`](crate::generator::CachingContentGenerator).
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    pub cache: CacheConfig,
    pub dedup: DedupConfig,
}

impl GeneratorConfig {
    /// Defaults seeded from the process environment.
    pub fn from_env() -> Self {
        let defaults = CacheConfig::default();
        let cache = CacheConfig::new()
            .enabled(env_bool(ENV_CACHE_ENABLED, defaults.enabled))
            .ttl(Duration::from_millis(env_u64(
                ENV_CACHE_TTL_MS,
                defaults.ttl.as_millis() as u64,
            )))
            .max_entries(env_u64(ENV_CACHE_MAX_ENTRIES, defaults.max_entries as u64) as usize);
        let dedup = DedupConfig::new().enabled(env_bool(ENV_DEDUP_ENABLED, true));
        Self { cache, dedup }
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn dedup(mut self, dedup: DedupConfig) -> Self {
        self.dedup = dedup;
        self
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => {
                warn!(var = name, value = other, "unparseable boolean, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(var = name, value = %value, "unparseable integer, using default");
                default
            }
        },
        Err(_) => default,
    }
}
