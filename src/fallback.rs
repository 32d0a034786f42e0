//! Priority-ordered model fallback with health tracking.
//!
//! [`ModelFallbackManager`] owns a registry of named models, each with a
//! priority and a health record. Execution is routed to the best currently
//! healthy model; on a fallback-eligible error the next one in priority
//! order is tried, so an unhealthy primary degrades service to a backup
//! instead of failing the request.
//!
//! # Fallback triggers
//!
//! The chain advances on errors classified as eligible by
//! [`GarmrError::is_fallback_eligible`]: 5xx, 429, network-level, and
//! unclassified errors. Client errors (4xx except 429) are terminal — the
//! request itself is bad, and no other model will fix it.
//!
//! # Health lifecycle
//!
//! A model is marked unhealthy once its consecutive failure count reaches
//! `max_failures`. It becomes healthy again on an explicit success, or —
//! when auto-recovery is enabled — lazily, the next time model state is
//! queried after `recovery_timeout` has elapsed since its last failure.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::telemetry;
use crate::{GarmrError, Result};

/// Configuration for fallback health tracking.
#[derive(Debug, Clone)]
pub struct FallbackConfig {
    /// Consecutive failures before a model is marked unhealthy. Default: 3.
    pub max_failures: usize,
    /// Idle period after the last failure before an unhealthy model is
    /// considered recovered. Default: 60s.
    pub recovery_timeout: Duration,
    /// Whether unhealthy models recover automatically. Default: true.
    pub auto_recovery: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            max_failures: 3,
            recovery_timeout: Duration::from_secs(60),
            auto_recovery: true,
        }
    }
}

impl FallbackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_failures(mut self, n: usize) -> Self {
        self.max_failures = n;
        self
    }

    pub fn recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    pub fn auto_recovery(mut self, enabled: bool) -> Self {
        self.auto_recovery = enabled;
        self
    }
}

/// A registered model: identifier plus chain position.
///
/// Lower `priority` values are tried first.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub id: String,
    pub priority: u32,
}

impl ModelConfig {
    pub fn new(id: impl Into<String>, priority: u32) -> Self {
        Self {
            id: id.into(),
            priority,
        }
    }
}

/// Point-in-time health view of one registered model.
#[derive(Debug, Clone)]
pub struct ModelStatus {
    pub id: String,
    pub priority: u32,
    pub healthy: bool,
    pub failure_count: usize,
}

/// Successful fallback execution: the result plus the model that produced it.
#[derive(Debug)]
pub struct FallbackOutcome<T> {
    pub result: T,
    pub model: String,
}

struct ModelEntry {
    config: ModelConfig,
    healthy: bool,
    failure_count: usize,
    last_failure: Option<Instant>,
}

/// Priority-ordered chain of named models with health tracking.
pub struct ModelFallbackManager {
    config: FallbackConfig,
    models: Mutex<Vec<ModelEntry>>,
}

impl ModelFallbackManager {
    /// Create an empty manager.
    pub fn new(config: FallbackConfig) -> Self {
        Self {
            config,
            models: Mutex::new(Vec::new()),
        }
    }

    /// Register a model, replacing any existing registration with the same id.
    pub fn add_model(&self, config: ModelConfig) {
        let mut models = self.models.lock().expect("fallback lock poisoned");
        models.retain(|m| m.config.id != config.id);
        models.push(ModelEntry {
            config,
            healthy: true,
            failure_count: 0,
            last_failure: None,
        });
    }

    /// Remove a model from the chain.
    pub fn remove_model(&self, id: &str) {
        let mut models = self.models.lock().expect("fallback lock poisoned");
        models.retain(|m| m.config.id != id);
    }

    /// The lowest-priority-value healthy model right now.
    ///
    /// Recomputed on every call — auto-recovery is applied first, so a
    /// model whose recovery timeout has elapsed can reclaim this slot.
    pub fn current_model(&self) -> Option<String> {
        let mut models = self.models.lock().expect("fallback lock poisoned");
        self.auto_recover(&mut models, Instant::now());
        models
            .iter()
            .filter(|m| m.healthy)
            .min_by_key(|m| m.config.priority)
            .map(|m| m.config.id.clone())
    }

    /// Record a successful call: failure count resets, health restored.
    pub fn record_success(&self, id: &str) {
        let mut models = self.models.lock().expect("fallback lock poisoned");
        if let Some(entry) = models.iter_mut().find(|m| m.config.id == id) {
            entry.failure_count = 0;
            entry.healthy = true;
            entry.last_failure = None;
        }
    }

    /// Record a failed call; marks the model unhealthy at `max_failures`.
    pub fn record_failure(&self, id: &str) {
        let mut models = self.models.lock().expect("fallback lock poisoned");
        if let Some(entry) = models.iter_mut().find(|m| m.config.id == id) {
            entry.failure_count += 1;
            entry.last_failure = Some(Instant::now());
            if entry.healthy && entry.failure_count >= self.config.max_failures {
                entry.healthy = false;
                warn!(
                    model = id,
                    failures = entry.failure_count,
                    "model marked unhealthy"
                );
            }
        }
    }

    /// Execute `f` against healthy models in ascending priority order.
    ///
    /// Stops at the first success, recording it and returning the result
    /// together with the model that produced it. A terminal error (4xx
    /// other than 429) stops the chain immediately and propagates; eligible
    /// errors advance to the next model. When every healthy model has
    /// failed, the last underlying error is rethrown.
    ///
    /// Fails with [`GarmrError::NoHealthyModels`] before invoking `f` at
    /// all when the chain is empty or fully unhealthy.
    #[instrument(skip(self, f), fields(operation = "execute_with_fallback"))]
    pub async fn execute_with_fallback<F, Fut, T>(&self, mut f: F) -> Result<FallbackOutcome<T>>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let candidates: Vec<String> = {
            let mut models = self.models.lock().expect("fallback lock poisoned");
            self.auto_recover(&mut models, Instant::now());
            let mut healthy: Vec<&ModelEntry> = models.iter().filter(|m| m.healthy).collect();
            healthy.sort_by_key(|m| m.config.priority);
            healthy.iter().map(|m| m.config.id.clone()).collect()
        };

        if candidates.is_empty() {
            return Err(GarmrError::NoHealthyModels);
        }

        let mut last_err = None;
        for model in candidates {
            match f(model.clone()).await {
                Ok(result) => {
                    self.record_success(&model);
                    return Ok(FallbackOutcome { result, model });
                }
                Err(e) if e.is_fallback_eligible() => {
                    self.record_failure(&model);
                    metrics::counter!(telemetry::FALLBACK_SWITCHES_TOTAL,
                        "from_model" => model.clone(),
                    )
                    .increment(1);
                    debug!(%model, error = %e, "falling back to next model");
                    last_err = Some(e);
                }
                Err(e) => {
                    // Terminal: the request itself is bad.
                    self.record_failure(&model);
                    return Err(e);
                }
            }
        }
        Err(last_err.unwrap_or(GarmrError::NoHealthyModels))
    }

    /// Health view of every registered model, in priority order.
    pub fn model_statuses(&self) -> Vec<ModelStatus> {
        let mut models = self.models.lock().expect("fallback lock poisoned");
        self.auto_recover(&mut models, Instant::now());
        let mut statuses: Vec<ModelStatus> = models
            .iter()
            .map(|m| ModelStatus {
                id: m.config.id.clone(),
                priority: m.config.priority,
                healthy: m.healthy,
                failure_count: m.failure_count,
            })
            .collect();
        statuses.sort_by_key(|s| s.priority);
        statuses
    }

    /// Manually mark a model healthy, clearing its failure record.
    pub fn force_healthy(&self, id: &str) {
        self.record_success(id);
    }

    /// Manually mark a model unhealthy.
    pub fn force_unhealthy(&self, id: &str) {
        let mut models = self.models.lock().expect("fallback lock poisoned");
        if let Some(entry) = models.iter_mut().find(|m| m.config.id == id) {
            entry.healthy = false;
            entry.failure_count = self.config.max_failures;
            entry.last_failure = Some(Instant::now());
        }
    }

    /// Lazily restore unhealthy models whose recovery timeout has elapsed.
    fn auto_recover(&self, models: &mut [ModelEntry], now: Instant) {
        if !self.config.auto_recovery {
            return;
        }
        for entry in models.iter_mut().filter(|m| !m.healthy) {
            let recovered = entry
                .last_failure
                .is_some_and(|t| now.duration_since(t) >= self.config.recovery_timeout);
            if recovered {
                entry.healthy = true;
                entry.failure_count = 0;
                entry.last_failure = None;
                debug!(model = %entry.config.id, "model auto-recovered");
            }
        }
    }
}
