//! Token-budgeted conversation history compression.
//!
//! [`HistoryCompressor`] reduces a growing transcript to fit a token
//! budget while keeping what matters: the most recent turns survive
//! byte-for-byte, older turns are shortened or elided oldest-first, and
//! turns carrying tool round-trips are treated as atomic — kept or
//! dropped whole, never split.
//!
//! Token counts are a fast character-based proxy
//! (`ceil(chars / chars_per_token)`), not a real tokenizer. The estimate
//! only has to be consistent with itself: the same proxy decides both
//! whether compression is needed and what fits the budget.
//!
//! Compression never reorders turns. When any older turn is dropped
//! outright, a single synthetic marker turn is prepended so the model
//! knows earlier context existed.

use std::sync::Mutex;

use crate::telemetry;
use crate::types::{Content, Part};

/// Text inserted between the head and tail excerpts of a shortened part.
const TRUNCATION_MARKER: &str = "...[truncated]...";

/// Marker turn text prepended when older turns were dropped.
const COMPRESSION_MARKER: &str = "[earlier conversation compressed]";

/// How much tighter aggressive truncation is than light truncation.
const AGGRESSIVE_DIVISOR: usize = 4;

/// Configuration for history compression.
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Token budget the compressed history must fit. Default: 32768.
    pub max_tokens: usize,
    /// Characters per token in the estimation proxy. Default: 4.
    pub chars_per_token: usize,
    /// Number of recent turn *pairs* preserved unmodified; `2×` this many
    /// trailing turns are kept byte-for-byte. Default: 4.
    pub preserve_recent_turns: usize,
    /// Keep tool-call/tool-result parts even under aggressive shortening.
    /// Default: false.
    pub preserve_tool_calls: bool,
    /// Character target for lightly-truncated text parts. Default: 1000.
    pub truncate_length: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_tokens: 32_768,
            chars_per_token: 4,
            preserve_recent_turns: 4,
            preserve_tool_calls: false,
            truncate_length: 1000,
        }
    }
}

impl CompressionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn chars_per_token(mut self, chars: usize) -> Self {
        self.chars_per_token = chars;
        self
    }

    pub fn preserve_recent_turns(mut self, pairs: usize) -> Self {
        self.preserve_recent_turns = pairs;
        self
    }

    pub fn preserve_tool_calls(mut self, keep: bool) -> Self {
        self.preserve_tool_calls = keep;
        self
    }

    pub fn truncate_length(mut self, chars: usize) -> Self {
        self.truncate_length = chars;
        self
    }
}

/// Partial reconfiguration of a live compressor.
#[derive(Debug, Clone, Default)]
pub struct CompressionUpdate {
    pub max_tokens: Option<usize>,
    pub chars_per_token: Option<usize>,
    pub preserve_recent_turns: Option<usize>,
    pub preserve_tool_calls: Option<bool>,
    pub truncate_length: Option<usize>,
}

/// Before/after accounting for one compression pass.
#[derive(Debug, Clone)]
pub struct CompressionStats {
    pub original_tokens: usize,
    pub compressed_tokens: usize,
    /// Token reduction as a percentage of the original total.
    pub reduction_percent: f64,
    /// Turns removed, by sequence-length delta.
    pub turns_removed: usize,
}

/// Token-budgeted history compressor.
pub struct HistoryCompressor {
    config: Mutex<CompressionConfig>,
}

impl HistoryCompressor {
    /// Create a compressor with the given configuration.
    pub fn new(config: CompressionConfig) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    /// Whether `history` exceeds the token budget.
    ///
    /// Early-exit scan: returns true as soon as the running total passes
    /// the budget, without summing the rest.
    pub fn needs_compression(&self, history: &[Content]) -> bool {
        let config = self.config.lock().expect("compressor lock poisoned").clone();
        let mut running = 0usize;
        for turn in history {
            running += estimate_turn_tokens(turn, config.chars_per_token);
            if running > config.max_tokens {
                return true;
            }
        }
        false
    }

    /// Estimated token total for `history` under the current proxy.
    pub fn estimate_tokens(&self, history: &[Content]) -> usize {
        let config = self.config.lock().expect("compressor lock poisoned").clone();
        history
            .iter()
            .map(|turn| estimate_turn_tokens(turn, config.chars_per_token))
            .sum()
    }

    /// Compress `history` to fit the token budget.
    ///
    /// A history already within budget is returned unchanged. Otherwise
    /// the trailing `preserve_recent_turns × 2` turns are kept unmodified
    /// and older turns are fitted oldest-first into whatever budget
    /// remains: lightly shortened while it lasts, aggressively shortened
    /// once it runs out, dropped when even that does not fit.
    pub fn compress(&self, history: &[Content]) -> Vec<Content> {
        let config = self.config.lock().expect("compressor lock poisoned").clone();

        let total: usize = history
            .iter()
            .map(|turn| estimate_turn_tokens(turn, config.chars_per_token))
            .sum();
        if total <= config.max_tokens {
            return history.to_vec();
        }

        let recent_count = (config.preserve_recent_turns * 2).min(history.len());
        let split = history.len() - recent_count;
        let (older, recent) = history.split_at(split);

        let recent_tokens: usize = recent
            .iter()
            .map(|turn| estimate_turn_tokens(turn, config.chars_per_token))
            .sum();
        let older_budget = config.max_tokens.saturating_sub(recent_tokens);

        let mut kept_older = Vec::with_capacity(older.len());
        let mut running = 0usize;
        for turn in older {
            let light = shorten_lightly(turn, &config);
            let light_cost = estimate_turn_tokens(&light, config.chars_per_token);
            if running + light_cost <= older_budget {
                running += light_cost;
                kept_older.push(light);
                continue;
            }
            if let Some(aggressive) = shorten_aggressively(turn, &config) {
                let aggressive_cost = estimate_turn_tokens(&aggressive, config.chars_per_token);
                if running + aggressive_cost <= older_budget {
                    running += aggressive_cost;
                    kept_older.push(aggressive);
                    continue;
                }
            }
            // Neither form fits: the turn is elided entirely.
        }

        let dropped_any = kept_older.len() < older.len();
        let mut compressed =
            Vec::with_capacity(kept_older.len() + recent.len() + usize::from(dropped_any));
        if dropped_any {
            compressed.push(Content::system(COMPRESSION_MARKER));
        }
        compressed.extend(kept_older);
        compressed.extend_from_slice(recent);

        metrics::counter!(telemetry::COMPRESSIONS_TOTAL).increment(1);
        compressed
    }

    /// Before/after accounting for a compression pass.
    pub fn compression_stats(
        &self,
        original: &[Content],
        compressed: &[Content],
    ) -> CompressionStats {
        let config = self.config.lock().expect("compressor lock poisoned").clone();
        let original_tokens: usize = original
            .iter()
            .map(|turn| estimate_turn_tokens(turn, config.chars_per_token))
            .sum();
        let compressed_tokens: usize = compressed
            .iter()
            .map(|turn| estimate_turn_tokens(turn, config.chars_per_token))
            .sum();
        let reduction_percent = if original_tokens == 0 {
            0.0
        } else {
            100.0 * (original_tokens.saturating_sub(compressed_tokens)) as f64
                / original_tokens as f64
        };
        CompressionStats {
            original_tokens,
            compressed_tokens,
            reduction_percent,
            turns_removed: original.len().saturating_sub(compressed.len()),
        }
    }

    /// Apply a partial reconfiguration.
    pub fn set_options(&self, update: CompressionUpdate) {
        let mut config = self.config.lock().expect("compressor lock poisoned");
        if let Some(max) = update.max_tokens {
            config.max_tokens = max;
        }
        if let Some(chars) = update.chars_per_token {
            config.chars_per_token = chars.max(1);
        }
        if let Some(pairs) = update.preserve_recent_turns {
            config.preserve_recent_turns = pairs;
        }
        if let Some(keep) = update.preserve_tool_calls {
            config.preserve_tool_calls = keep;
        }
        if let Some(chars) = update.truncate_length {
            config.truncate_length = chars;
        }
    }
}

/// Estimate tokens for one turn: `ceil(chars / chars_per_token)`, where
/// chars covers text parts plus the serialized length of tool payloads.
fn estimate_turn_tokens(turn: &Content, chars_per_token: usize) -> usize {
    let chars: usize = turn.parts.iter().map(part_chars).sum();
    chars.div_ceil(chars_per_token.max(1))
}

fn part_chars(part: &Part) -> usize {
    match part {
        Part::Text(text) => text.chars().count(),
        Part::FunctionCall { name, args } => name.chars().count() + json_len(args),
        Part::FunctionResponse { name, response } => name.chars().count() + json_len(response),
    }
}

fn json_len(value: &serde_json::Value) -> usize {
    serde_json::to_string(value).map(|s| s.len()).unwrap_or(0)
}

/// Light shortening: long text parts are truncated to the configured
/// length; tool parts pass through untouched.
fn shorten_lightly(turn: &Content, config: &CompressionConfig) -> Content {
    let parts = turn
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => Part::Text(truncate_middle(text, config.truncate_length)),
            other => other.clone(),
        })
        .collect();
    Content {
        role: turn.role,
        parts,
    }
}

/// Aggressive shortening: tool parts are dropped (unless configured to be
/// preserved) and text is cut much harder. Returns `None` when nothing of
/// the turn survives.
fn shorten_aggressively(turn: &Content, config: &CompressionConfig) -> Option<Content> {
    let target = (config.truncate_length / AGGRESSIVE_DIVISOR).max(1);
    let parts: Vec<Part> = turn
        .parts
        .iter()
        .filter_map(|part| match part {
            Part::Text(text) => Some(Part::Text(truncate_middle(text, target))),
            tool if config.preserve_tool_calls => Some(tool.clone()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(Content {
            role: turn.role,
            parts,
        })
    }
}

/// Keep a head and tail excerpt of roughly half the target each, joined by
/// an explicit marker, so both the opening and closing context of a long
/// message survive.
fn truncate_middle(text: &str, target: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= target {
        return text.to_string();
    }
    let half = (target / 2).max(1);
    let head: String = chars[..half].iter().collect();
    let tail: String = chars[chars.len() - half..].iter().collect();
    format!("{head}{TRUNCATION_MARKER}{tail}")
}
