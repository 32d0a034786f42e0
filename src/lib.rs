//! Garmr - Request-governance middleware for LLM generation traffic
//!
//! This crate sits between an autonomous coding agent and a remote,
//! rate-limited, occasionally-unreliable generation endpoint. It decides
//! *whether, when, and how* a request is allowed to reach the transport
//! and records what happened — it never implements the transport itself.
//!
//! The saving layers compose around one abstract
//! [`ContentGenerator`](traits::ContentGenerator):
//!
//! - [`cache::ResponseCache`] — identical requests inside a freshness
//!   window are served from memory
//! - [`dedup::RequestDeduplicator`] — identical concurrent requests share
//!   one in-flight call
//! - [`limiter::RateLimiter`] — token-bucket admission control
//! - [`breaker::CircuitBreaker`] — stops hammering a failing target
//! - [`fallback::ModelFallbackManager`] — routes to the best healthy
//!   model, failing over on eligible errors
//! - [`compress::HistoryCompressor`] — keeps the transcript inside a
//!   token budget
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use garmr::{
//!     CachingContentGenerator, Content, ContentGenerator, GenerateRequest, GeneratorConfig,
//! };
//!
//! # async fn example(transport: Arc<dyn ContentGenerator>) -> garmr::Result<()> {
//! let generator = CachingContentGenerator::new(transport, &GeneratorConfig::from_env());
//!
//! let request = GenerateRequest::new(
//!     "gemini-2.5-pro",
//!     vec![Content::user("Summarize the failing test output.")],
//! );
//! let response = generator.generate_content(&request, "prompt-1").await?;
//! println!("{}", response.text().unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! The guards ([`limiter`], [`breaker`], [`fallback`]) are orthogonal:
//! compose them around the transport call as the deployment needs, e.g.
//! `breaker.execute(|| fallback.execute_with_fallback(|model| ...))`.
//! Named instances live in a [`registry::GuardRegistry`] constructed once
//! by the process entry point.

pub mod breaker;
pub mod cache;
pub mod compress;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fallback;
pub mod fingerprint;
pub mod generator;
pub mod limiter;
pub mod perf;
pub mod registry;
pub mod session;
pub mod stream;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use cache::{CacheConfig, CacheUpdate, ResponseCache};
pub use compress::{CompressionConfig, CompressionStats, CompressionUpdate, HistoryCompressor};
pub use config::GeneratorConfig;
pub use dedup::{DedupConfig, RequestDeduplicator};
pub use error::{GarmrError, Result};
pub use fallback::{
    FallbackConfig, FallbackOutcome, ModelConfig, ModelFallbackManager, ModelStatus,
};
pub use generator::CachingContentGenerator;
pub use limiter::{RateLimiter, RateLimiterConfig, RateLimiterStats, RateLimiterUpdate};
pub use perf::{MetricsSnapshot, PerformanceMetrics, RequestRecord, RequestType};
pub use registry::GuardRegistry;
pub use session::{SessionConfig, SessionData, SessionManager};
pub use traits::{ContentGenerator, ResponseStream};

// Re-export all types
pub use types::{
    Candidate, Content, Embedding, FinishReason, GenerateRequest, GenerateResponse,
    GenerationConfig, Part, Role, TokenCount, Usage,
};
