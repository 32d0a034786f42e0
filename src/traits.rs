//! Core ContentGenerator trait

use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;

use crate::{
    Embedding, GarmrError, GenerateRequest, GenerateResponse, Result, TokenCount,
};

/// A boxed stream of generation responses.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<GenerateResponse>> + Send>>;

/// The abstract generation capability this crate governs.
///
/// Implementations perform the actual call to a model provider. Everything
/// in this crate composes around this trait without knowing how the call is
/// transported; the only contract is that a request asynchronously produces
/// a response or fails with an error that may carry an HTTP-like status.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Non-streaming content generation.
    ///
    /// `prompt_id` identifies the logical prompt for logging and metrics;
    /// it never influences routing or caching.
    async fn generate_content(
        &self,
        request: &GenerateRequest,
        prompt_id: &str,
    ) -> Result<GenerateResponse>;

    /// Streaming content generation.
    async fn generate_content_stream(
        &self,
        request: &GenerateRequest,
        prompt_id: &str,
    ) -> Result<ResponseStream>;

    /// Count tokens for a request without generating.
    async fn count_tokens(&self, _request: &GenerateRequest) -> Result<TokenCount> {
        Err(GarmrError::NotImplemented("count_tokens"))
    }

    /// Generate an embedding for the request contents.
    async fn embed_content(&self, _request: &GenerateRequest) -> Result<Embedding> {
        Err(GarmrError::NotImplemented("embed_content"))
    }
}
