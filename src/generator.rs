//! Caching decorator around an abstract content generator.
//!
//! [`CachingContentGenerator`] wraps any [`ContentGenerator`] with the
//! request-saving layers, in order: cache lookup (hit returns
//! immediately), in-flight deduplication (identical concurrent request
//! awaits the same call), then delegation to the wrapped generator.
//! Successful responses carrying at least one candidate are written back
//! to the cache; error and empty-candidate responses never are.
//!
//! Streaming requests pass straight through — caching a stream would
//! require buffering it whole — but get bounded-channel backpressure via
//! [`stream::bounded_stream`](crate::stream::bounded_stream). Token
//! counting and embedding are cheap and pass through uncached.
//!
//! Rate limiting, circuit breaking, and model fallback are orthogonal
//! guards: compose them around the wrapped generator (or around calls to
//! this decorator) as the deployment needs. This type only decides
//! whether a generation request needs to reach the transport at all.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::cache::ResponseCache;
use crate::config::GeneratorConfig;
use crate::dedup::RequestDeduplicator;
use crate::fingerprint::request_fingerprint;
use crate::perf::{PerformanceMetrics, RequestRecord, RequestType};
use crate::stream::{DEFAULT_STREAM_BUFFER, bounded_stream};
use crate::telemetry;
use crate::traits::{ContentGenerator, ResponseStream};
use crate::types::{Embedding, GenerateRequest, GenerateResponse, TokenCount};
use crate::Result;

/// Default capacity of the performance-record log.
const DEFAULT_PERF_RECORDS: usize = 1000;

/// Decorator composing cache → dedup → wrapped generator.
pub struct CachingContentGenerator {
    inner: Arc<dyn ContentGenerator>,
    cache: ResponseCache,
    dedup: RequestDeduplicator,
    perf: Arc<PerformanceMetrics>,
    stream_buffer_size: usize,
}

impl CachingContentGenerator {
    /// Wrap a generator with caching and deduplication.
    pub fn new(inner: Arc<dyn ContentGenerator>, config: &GeneratorConfig) -> Self {
        Self {
            inner,
            cache: ResponseCache::new(&config.cache),
            dedup: RequestDeduplicator::new(&config.dedup),
            perf: Arc::new(PerformanceMetrics::new(DEFAULT_PERF_RECORDS)),
            stream_buffer_size: DEFAULT_STREAM_BUFFER,
        }
    }

    /// Share an externally-owned performance log instead of an internal one.
    pub fn with_performance_metrics(mut self, perf: Arc<PerformanceMetrics>) -> Self {
        self.perf = perf;
        self
    }

    /// Set the bounded-channel capacity used for streaming backpressure.
    pub fn stream_buffer_size(mut self, size: usize) -> Self {
        self.stream_buffer_size = size;
        self
    }

    /// The response cache, for operational control (clear, reconfigure).
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// The in-flight deduplicator, for introspection.
    pub fn deduplicator(&self) -> &RequestDeduplicator {
        &self.dedup
    }

    /// The request-outcome log this decorator appends to.
    pub fn performance_metrics(&self) -> Arc<PerformanceMetrics> {
        Arc::clone(&self.perf)
    }

    fn record_request(operation: &'static str, start: Instant, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        metrics::counter!(telemetry::REQUESTS_TOTAL,
            "operation" => operation,
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
            "operation" => operation,
        )
        .record(start.elapsed().as_secs_f64());
    }
}

#[async_trait]
impl ContentGenerator for CachingContentGenerator {
    #[instrument(skip(self, request), fields(operation = "generate", model = %request.model))]
    async fn generate_content(
        &self,
        request: &GenerateRequest,
        prompt_id: &str,
    ) -> Result<GenerateResponse> {
        let start = Instant::now();
        let key = request_fingerprint(request);

        if let Some(response) = self.cache.get(&key) {
            debug!(%key, "cache hit");
            self.perf.record(
                RequestRecord::new(&request.model, RequestType::Generate)
                    .cached(true)
                    .response_time(start.elapsed()),
            );
            Self::record_request("generate", start, true);
            return Ok(response);
        }

        let coalesced = self.dedup.is_in_flight(&key);
        let result = {
            let inner = Arc::clone(&self.inner);
            let request = request.clone();
            let prompt_id = prompt_id.to_string();
            self.dedup
                .deduplicate(&key, move || async move {
                    inner.generate_content(&request, &prompt_id).await
                })
                .await
        };

        match result {
            Ok(response) => {
                if response.has_candidates() {
                    self.cache.set(&key, response.clone(), None);
                } else {
                    debug!(%key, "response has no candidates, not caching");
                }
                let mut record = RequestRecord::new(&request.model, RequestType::Generate)
                    .deduped(coalesced)
                    .response_time(start.elapsed());
                if let Some(usage) = &response.usage {
                    record = record.token_count(usage.total_tokens);
                }
                self.perf.record(record);
                Self::record_request("generate", start, true);
                Ok(response)
            }
            Err(e) => {
                self.perf.record(
                    RequestRecord::new(&request.model, RequestType::Generate)
                        .deduped(coalesced)
                        .response_time(start.elapsed())
                        .error(e.to_string()),
                );
                Self::record_request("generate", start, false);
                Err(e)
            }
        }
    }

    #[instrument(skip(self, request), fields(operation = "generate_stream", model = %request.model))]
    async fn generate_content_stream(
        &self,
        request: &GenerateRequest,
        prompt_id: &str,
    ) -> Result<ResponseStream> {
        let start = Instant::now();
        match self.inner.generate_content_stream(request, prompt_id).await {
            Ok(stream) => {
                self.perf.record(
                    RequestRecord::new(&request.model, RequestType::GenerateStream)
                        .response_time(start.elapsed()),
                );
                Self::record_request("generate_stream", start, true);
                Ok(bounded_stream(stream, self.stream_buffer_size))
            }
            Err(e) => {
                self.perf.record(
                    RequestRecord::new(&request.model, RequestType::GenerateStream)
                        .response_time(start.elapsed())
                        .error(e.to_string()),
                );
                Self::record_request("generate_stream", start, false);
                Err(e)
            }
        }
    }

    async fn count_tokens(&self, request: &GenerateRequest) -> Result<TokenCount> {
        self.inner.count_tokens(request).await
    }

    async fn embed_content(&self, request: &GenerateRequest) -> Result<Embedding> {
        self.inner.embed_content(request).await
    }
}
