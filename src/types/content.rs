//! Conversation turn types
//!
//! A [`Content`] is one turn of a conversation: a role plus an ordered
//! list of [`Part`]s. Parts are free text or an opaque function-call /
//! function-response payload carried through to the transport untouched.

use serde::{Deserialize, Serialize};

/// Role of a turn's author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Model,
}

/// One part of a turn's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    /// Free text.
    Text(String),
    /// A tool invocation requested by the model. Arguments are opaque JSON.
    FunctionCall {
        name: String,
        args: serde_json::Value,
    },
    /// The result of a tool invocation, echoed back to the model.
    FunctionResponse {
        name: String,
        response: serde_json::Value,
    },
}

impl Part {
    /// Get the text content, if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this part is a function call or function response.
    pub fn is_tool_part(&self) -> bool {
        matches!(
            self,
            Part::FunctionCall { .. } | Part::FunctionResponse { .. }
        )
    }
}

/// A single conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a user turn with a single text part
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Create a model turn with a single text part
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Create a system turn with a single text part
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Create a model turn carrying a function call
    pub fn function_call(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::FunctionCall {
                name: name.into(),
                args,
            }],
        }
    }

    /// Create a user turn carrying a function response
    pub fn function_response(name: impl Into<String>, response: serde_json::Value) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::FunctionResponse {
                name: name.into(),
                response,
            }],
        }
    }

    /// Whether any part of this turn is a function call or response.
    ///
    /// Turns containing tool round-trip parts are treated as atomic by the
    /// [`HistoryCompressor`](crate::compress::HistoryCompressor) — they are
    /// kept or dropped whole, never split.
    pub fn has_tool_parts(&self) -> bool {
        self.parts.iter().any(Part::is_tool_part)
    }
}
