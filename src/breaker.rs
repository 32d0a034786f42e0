//! Circuit breaker for a consistently failing target.
//!
//! [`CircuitBreaker`] is a three-state automaton: `Closed` (requests flow,
//! failures are counted), `Open` (requests are rejected without touching
//! the transport), `HalfOpen` (one cooldown has elapsed; probe requests
//! are admitted to test recovery).
//!
//! ```text
//!              trip condition                reset timeout (lazy, on read)
//!   CLOSED ───────────────────► OPEN ─────────────────────► HALF_OPEN
//!     ▲                          ▲                              │
//!     │        one success       │         one failure          │
//!     └──────────────────────────┼──────────────────────────────┤
//!                                └──────────────────────────────┘
//! ```
//!
//! The `Open → HalfOpen` transition is driven by reads: any state query
//! first checks whether the cooldown has elapsed. No timer callbacks, so
//! the machine is fully deterministic under a paused test clock.

use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::telemetry;
use crate::{GarmrError, Result};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(name)
    }
}

/// Configuration for the circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failures within the window that trip the circuit. Default: 5.
    pub failure_threshold: usize,
    /// Optional success-rate floor. When set, the circuit also trips if
    /// the in-window success rate falls below this value once at least
    /// `failure_threshold` outcomes have been recorded.
    pub success_rate_threshold: Option<f64>,
    /// Sliding window over which outcomes are counted. Default: 60s.
    pub window: Duration,
    /// Cooldown before an open circuit admits a probe. Default: 30s.
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_rate_threshold: None,
            window: Duration::from_secs(60),
            reset_timeout: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure_threshold(mut self, n: usize) -> Self {
        self.failure_threshold = n;
        self
    }

    pub fn success_rate_threshold(mut self, rate: f64) -> Self {
        self.success_rate_threshold = Some(rate);
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }
}

struct Machine {
    state: CircuitState,
    failures: Vec<Instant>,
    successes: Vec<Instant>,
    last_transition: Instant,
}

/// Three-state failure-protection automaton.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    machine: Mutex<Machine>,
}

impl CircuitBreaker {
    /// Create a breaker in the `Closed` state.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            machine: Mutex::new(Machine {
                state: CircuitState::Closed,
                failures: Vec::new(),
                successes: Vec::new(),
                last_transition: Instant::now(),
            }),
        }
    }

    /// Record a failed call against the protected target.
    ///
    /// In `HalfOpen`, a single failure re-opens the circuit. In `Closed`,
    /// the circuit opens once the trip condition holds over the window.
    pub fn record_failure(&self) {
        let mut machine = self.machine.lock().expect("breaker lock poisoned");
        let now = Instant::now();
        self.prune(&mut machine, now);
        machine.failures.push(now);
        match machine.state {
            CircuitState::HalfOpen => {
                self.transition(&mut machine, CircuitState::Open, now);
            }
            CircuitState::Closed if self.trip_condition(&machine) => {
                self.transition(&mut machine, CircuitState::Open, now);
            }
            _ => {}
        }
    }

    /// Record a successful call against the protected target.
    ///
    /// In `HalfOpen`, one success closes the circuit and clears all
    /// recorded outcomes — a fresh start.
    pub fn record_success(&self) {
        let mut machine = self.machine.lock().expect("breaker lock poisoned");
        let now = Instant::now();
        self.prune(&mut machine, now);
        machine.successes.push(now);
        if machine.state == CircuitState::HalfOpen {
            self.transition(&mut machine, CircuitState::Closed, now);
        }
    }

    /// Current state, applying the lazy cooldown transition first.
    pub fn state(&self) -> CircuitState {
        let mut machine = self.machine.lock().expect("breaker lock poisoned");
        self.maybe_half_open(&mut machine, Instant::now());
        machine.state
    }

    /// Whether a request may proceed right now.
    ///
    /// `HalfOpen` admits requests — those are the probes that decide
    /// whether the target has recovered.
    pub fn is_allowed(&self) -> bool {
        let mut machine = self.machine.lock().expect("breaker lock poisoned");
        self.maybe_half_open(&mut machine, Instant::now());
        machine.state != CircuitState::Open
    }

    /// Run `f` under the breaker's protection.
    ///
    /// If the circuit is open, fails immediately with
    /// [`GarmrError::CircuitOpen`] carrying the remaining cooldown, without
    /// invoking `f`. Otherwise invokes `f`, records the outcome, and
    /// rethrows failures unchanged.
    pub async fn execute<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        {
            let mut machine = self.machine.lock().expect("breaker lock poisoned");
            let now = Instant::now();
            self.maybe_half_open(&mut machine, now);
            if machine.state == CircuitState::Open {
                let elapsed = now.duration_since(machine.last_transition);
                let retry_in = self.config.reset_timeout.saturating_sub(elapsed);
                metrics::counter!(telemetry::BREAKER_REJECTED_TOTAL).increment(1);
                return Err(GarmrError::CircuitOpen { retry_in });
            }
        }

        match f().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(err)
            }
        }
    }

    /// Manually open the circuit, bypassing the trip condition.
    pub fn force_open(&self) {
        let mut machine = self.machine.lock().expect("breaker lock poisoned");
        let now = Instant::now();
        if machine.state != CircuitState::Open {
            self.transition(&mut machine, CircuitState::Open, now);
        }
    }

    /// Manually close the circuit and clear recorded outcomes.
    pub fn force_close(&self) {
        let mut machine = self.machine.lock().expect("breaker lock poisoned");
        let now = Instant::now();
        if machine.state != CircuitState::Closed {
            self.transition(&mut machine, CircuitState::Closed, now);
        } else {
            machine.failures.clear();
            machine.successes.clear();
        }
    }

    /// Failures currently inside the window.
    pub fn failure_count(&self) -> usize {
        let mut machine = self.machine.lock().expect("breaker lock poisoned");
        self.prune(&mut machine, Instant::now());
        machine.failures.len()
    }

    /// Drop outcome timestamps that have aged out of the window.
    fn prune(&self, machine: &mut Machine, now: Instant) {
        let window = self.config.window;
        machine
            .failures
            .retain(|t| now.duration_since(*t) <= window);
        machine
            .successes
            .retain(|t| now.duration_since(*t) <= window);
    }

    /// Whether the in-window outcomes justify opening the circuit.
    fn trip_condition(&self, machine: &Machine) -> bool {
        let failures = machine.failures.len();
        if failures >= self.config.failure_threshold {
            return true;
        }
        if let Some(floor) = self.config.success_rate_threshold {
            let total = failures + machine.successes.len();
            if total >= self.config.failure_threshold {
                let success_rate = machine.successes.len() as f64 / total as f64;
                return success_rate < floor;
            }
        }
        false
    }

    /// Lazy `Open → HalfOpen` transition once the cooldown has elapsed.
    fn maybe_half_open(&self, machine: &mut Machine, now: Instant) {
        if machine.state == CircuitState::Open
            && now.duration_since(machine.last_transition) >= self.config.reset_timeout
        {
            self.transition(machine, CircuitState::HalfOpen, now);
        }
    }

    /// The single place `state` and `last_transition` change.
    fn transition(&self, machine: &mut Machine, to: CircuitState, now: Instant) {
        let from = machine.state;
        machine.state = to;
        machine.last_transition = now;
        if to == CircuitState::Closed {
            machine.failures.clear();
            machine.successes.clear();
        }
        metrics::counter!(telemetry::BREAKER_TRANSITIONS_TOTAL,
            "from" => from.to_string(),
            "to" => to.to_string(),
        )
        .increment(1);
        match to {
            CircuitState::Open => warn!(%from, %to, "circuit opened"),
            _ => debug!(%from, %to, "circuit transition"),
        }
    }
}
