//! Generation request and sampling configuration types

use serde::{Deserialize, Serialize};

use super::content::Content;

/// A generation request (provider-agnostic)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Target model identifier.
    pub model: String,
    /// Conversation transcript, oldest turn first.
    pub contents: Vec<Content>,
    /// Sampling configuration.
    #[serde(default)]
    pub config: GenerationConfig,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, contents: Vec<Content>) -> Self {
        Self {
            model: model.into(),
            contents,
            config: GenerationConfig::default(),
        }
    }

    pub fn config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }
}

/// Sampling configuration for a generation request.
///
/// The deterministic subset (`temperature`, `top_p`, `top_k`,
/// `max_output_tokens`) participates in the response-cache fingerprint;
/// the remaining knobs do not affect which cached response a request maps
/// to. See [`fingerprint`](crate::fingerprint) for the exact key contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    /// Request per-token log probabilities. Non-deterministic output shape;
    /// excluded from the cache fingerprint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,
}

impl GenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.top_p = Some(p);
        self
    }

    pub fn top_k(mut self, k: u32) -> Self {
        self.top_k = Some(k);
        self
    }

    pub fn max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    pub fn candidate_count(mut self, n: u32) -> Self {
        self.candidate_count = Some(n);
        self
    }

    pub fn stop_sequences(mut self, stop: Vec<String>) -> Self {
        self.stop_sequences = Some(stop);
        self
    }

    pub fn logprobs(mut self, enabled: bool) -> Self {
        self.logprobs = Some(enabled);
        self
    }
}
