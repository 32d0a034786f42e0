//! In-memory request-outcome log and derived efficiency statistics.
//!
//! [`PerformanceMetrics`] is the passive observer consumed by the request
//! path: every governed request appends one [`RequestRecord`], the log is
//! capacity-bounded (oldest dropped), and rates are derived on demand.
//! This complements the `metrics` facade emissions — the facade feeds an
//! external recorder, this log answers "how is this session doing"
//! questions in-process.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

/// Response-time target used by the efficiency score's latency factor.
const TARGET_RESPONSE_MS: f64 = 2000.0;

/// The governed operation a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Generate,
    GenerateStream,
    CountTokens,
    EmbedContent,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestType::Generate => "generate",
            RequestType::GenerateStream => "generate_stream",
            RequestType::CountTokens => "count_tokens",
            RequestType::EmbedContent => "embed_content",
        };
        f.write_str(name)
    }
}

/// One request outcome.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub timestamp: SystemTime,
    pub model: String,
    pub request_type: RequestType,
    pub cached: bool,
    pub deduped: bool,
    pub response_time: Duration,
    pub token_count: Option<u32>,
    pub error: Option<String>,
    pub retried: bool,
}

impl RequestRecord {
    pub fn new(model: impl Into<String>, request_type: RequestType) -> Self {
        Self {
            timestamp: SystemTime::now(),
            model: model.into(),
            request_type,
            cached: false,
            deduped: false,
            response_time: Duration::ZERO,
            token_count: None,
            error: None,
            retried: false,
        }
    }

    pub fn cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    pub fn deduped(mut self, deduped: bool) -> Self {
        self.deduped = deduped;
        self
    }

    pub fn response_time(mut self, elapsed: Duration) -> Self {
        self.response_time = elapsed;
        self
    }

    pub fn token_count(mut self, tokens: u32) -> Self {
        self.token_count = Some(tokens);
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    pub fn retried(mut self, retried: bool) -> Self {
        self.retried = retried;
        self
    }
}

/// Rates derived from the current record window.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    /// Fraction of requests served from cache.
    pub cache_hit_rate: f64,
    /// Fraction of requests coalesced onto an in-flight execution.
    pub dedup_rate: f64,
    /// Fraction of requests that failed.
    pub error_rate: f64,
    /// Mean response time over the window, in milliseconds.
    pub avg_response_ms: f64,
    /// Composite 0–100 score; see [`PerformanceMetrics::snapshot`].
    pub efficiency_score: f64,
}

/// Capacity-bounded request-outcome log.
pub struct PerformanceMetrics {
    max_records: usize,
    records: Mutex<VecDeque<RequestRecord>>,
}

impl PerformanceMetrics {
    /// Create a log bounded to `max_records` entries (oldest dropped).
    pub fn new(max_records: usize) -> Self {
        Self {
            max_records,
            records: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a record, dropping the oldest once at capacity.
    pub fn record(&self, record: RequestRecord) {
        let mut records = self.records.lock().expect("metrics lock poisoned");
        records.push_back(record);
        while records.len() > self.max_records {
            records.pop_front();
        }
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.lock().expect("metrics lock poisoned").len()
    }

    /// Whether the log holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all records.
    pub fn clear(&self) {
        self.records.lock().expect("metrics lock poisoned").clear();
    }

    /// Derive rates and the composite efficiency score.
    ///
    /// The score weighs cache hits 25, deduplication 15, success 40, and
    /// latency 20, with latency scored against a 2s target. An empty
    /// window scores 100 — nothing has gone wrong yet.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let records = self.records.lock().expect("metrics lock poisoned");
        let total = records.len();
        if total == 0 {
            return MetricsSnapshot {
                total_requests: 0,
                cache_hit_rate: 0.0,
                dedup_rate: 0.0,
                error_rate: 0.0,
                avg_response_ms: 0.0,
                efficiency_score: 100.0,
            };
        }

        let hits = records.iter().filter(|r| r.cached).count();
        let deduped = records.iter().filter(|r| r.deduped).count();
        let errors = records.iter().filter(|r| r.error.is_some()).count();
        let total_ms: f64 = records
            .iter()
            .map(|r| r.response_time.as_secs_f64() * 1000.0)
            .sum();

        let cache_hit_rate = hits as f64 / total as f64;
        let dedup_rate = deduped as f64 / total as f64;
        let error_rate = errors as f64 / total as f64;
        let avg_response_ms = total_ms / total as f64;

        let latency_factor = (1.0 - avg_response_ms / TARGET_RESPONSE_MS).clamp(0.0, 1.0);
        let efficiency_score = cache_hit_rate * 25.0
            + dedup_rate * 15.0
            + (1.0 - error_rate) * 40.0
            + latency_factor * 20.0;

        MetricsSnapshot {
            total_requests: total,
            cache_hit_rate,
            dedup_rate,
            error_rate,
            avg_response_ms,
            efficiency_score,
        }
    }
}
