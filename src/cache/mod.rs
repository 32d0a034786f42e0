//! Caching subsystem.
//!
//! [`response::ResponseCache`] is a content-addressed, size- and
//! time-bounded store of prior generation responses, keyed on the
//! canonical request digest from [`fingerprint`](crate::fingerprint).
//! It sits inside
//! [`CachingContentGenerator`](crate::generator::CachingContentGenerator),
//! in front of the in-flight deduplicator and the wrapped generator: a
//! cache hit bypasses both entirely. Cache hit/miss metrics are emitted
//! separately from request metrics.
//!
//! Only non-streaming `generate_content` responses are cached. Streaming
//! responses are consumed incrementally and caching them would require
//! full buffering; token counts and embeddings are cheap enough not to
//! bother.

pub mod response;

pub use response::{CacheConfig, CacheUpdate, ResponseCache};
