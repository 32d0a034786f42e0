//! Canonical request fingerprints.
//!
//! Both the [`ResponseCache`](crate::cache::ResponseCache) and the
//! [`RequestDeduplicator`](crate::dedup::RequestDeduplicator) key on the
//! same canonical digest of a request, computed here, while keeping
//! separate maps — cache freshness and in-flight coalescing are
//! independent concerns.
//!
//! # Canonical encoding
//!
//! The digest covers only the deterministic subset of a request: model id,
//! contents, and the sampling knobs that change what the model produces
//! (`temperature`, `top_p`, `top_k`, `max_output_tokens`). Output-shape
//! knobs such as `logprobs` are excluded — two requests that differ only
//! there map to the same response.
//!
//! Fields are assembled into a `serde_json::Value` object before
//! serialization. serde_json's default map is `BTreeMap`-backed, so the
//! encoded form has stable key ordering regardless of how the request
//! struct was built. The encoded string is then hashed to a fixed-width
//! hex digest.
//!
//! The hash (SipHash via `DefaultHasher`) is deterministic within a
//! process lifetime, which is sufficient for in-memory maps. A distributed
//! backend would need a cross-process stable hash instead.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde_json::json;

use crate::types::GenerateRequest;

/// Compute the canonical fingerprint of a request's deterministic subset.
///
/// Structurally identical requests always produce the same digest,
/// independent of field assembly order.
pub fn request_fingerprint(request: &GenerateRequest) -> String {
    let canonical = json!({
        "model": request.model,
        "contents": request.contents,
        "temperature": request.config.temperature,
        "topP": request.config.top_p,
        "topK": request.config.top_k,
        "maxOutputTokens": request.config.max_output_tokens,
    });
    // BTreeMap-backed object: serialization order is key order, not
    // insertion order.
    let encoded = canonical.to_string();

    let mut hasher = DefaultHasher::new();
    encoded.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
