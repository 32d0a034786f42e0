//! Generation response types

use serde::{Deserialize, Serialize};

use super::content::Content;

/// Non-streaming generation response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Candidate completions. Empty when the model produced nothing
    /// usable; such responses are never cached.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl GenerateResponse {
    /// Convenience access to the first candidate's text, if any.
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .and_then(|p| p.as_text())
    }

    /// Whether this response carries at least one candidate.
    pub fn has_candidates(&self) -> bool {
        !self.candidates.is_empty()
    }
}

/// A single candidate completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub content: Content,
    #[serde(default)]
    pub finish_reason: FinishReason,
}

impl Candidate {
    pub fn new(content: Content) -> Self {
        Self {
            content,
            finish_reason: FinishReason::Stop,
        }
    }
}

/// Reason the model stopped generating
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[default]
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Result of a token-count request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenCount {
    pub total_tokens: u32,
}

/// Result of an embedding request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    pub model: String,
    pub dimensions: usize,
}
