//! Tests for [`HistoryCompressor`] — token-budgeted transcript
//! compression with recent-turn preservation.

use garmr::compress::{CompressionConfig, CompressionUpdate, HistoryCompressor};
use garmr::types::{Content, Part};

/// A turn pair (user + model) where each text is `chars` characters.
fn turn_pair(chars: usize, tag: usize) -> Vec<Content> {
    vec![
        Content::user(format!("u{tag}-{}", "x".repeat(chars))),
        Content::model(format!("m{tag}-{}", "y".repeat(chars))),
    ]
}

fn history_of(pairs: usize, chars: usize) -> Vec<Content> {
    (0..pairs).flat_map(|i| turn_pair(chars, i)).collect()
}

fn compressor(max_tokens: usize) -> HistoryCompressor {
    HistoryCompressor::new(
        CompressionConfig::new()
            .max_tokens(max_tokens)
            .chars_per_token(4)
            .preserve_recent_turns(1)
            .truncate_length(100),
    )
}

// =========================================================================
// needs_compression
// =========================================================================

#[test]
fn small_history_needs_no_compression() {
    let compressor = compressor(1000);
    let history = history_of(2, 40);
    assert!(!compressor.needs_compression(&history));
}

#[test]
fn oversized_history_needs_compression() {
    let compressor = compressor(100);
    let history = history_of(10, 400);
    assert!(compressor.needs_compression(&history));
}

// =========================================================================
// compress
// =========================================================================

#[test]
fn under_budget_round_trips_unchanged() {
    let compressor = compressor(10_000);
    let history = history_of(3, 40);
    let compressed = compressor.compress(&history);
    assert_eq!(compressed, history);
}

#[test]
fn over_budget_compresses_to_fewer_turns() {
    let compressor = compressor(200);
    let history = history_of(20, 800);
    let compressed = compressor.compress(&history);

    assert!(compressed.len() < history.len());
    assert!(
        compressor.estimate_tokens(&compressed) < compressor.estimate_tokens(&history),
        "compression must reduce the token estimate"
    );
}

#[test]
fn recent_turns_survive_byte_for_byte() {
    let compressor = compressor(200);
    let history = history_of(20, 800);
    let compressed = compressor.compress(&history);

    // preserve_recent_turns = 1 keeps the last 2 turns unmodified.
    let recent = &history[history.len() - 2..];
    let kept = &compressed[compressed.len() - 2..];
    assert_eq!(kept, recent);
}

#[test]
fn marker_prepended_when_turns_dropped() {
    let compressor = compressor(200);
    let history = history_of(20, 800);
    let compressed = compressor.compress(&history);

    let first_text = compressed[0].parts[0].as_text().unwrap();
    assert!(
        first_text.contains("compressed"),
        "expected a synthetic marker turn, got {first_text:?}"
    );
}

#[test]
fn no_marker_when_only_shortened() {
    // Budget large enough that every older turn fits lightly shortened.
    let compressor = HistoryCompressor::new(
        CompressionConfig::new()
            .max_tokens(500)
            .chars_per_token(4)
            .preserve_recent_turns(1)
            .truncate_length(40),
    );
    // 4 older turns of 800 chars shorten to ~57 chars ≈ 15 tokens each,
    // well inside the ~96 tokens left after the preserved recent pair.
    let history = history_of(3, 800);
    let compressed = compressor.compress(&history);

    assert_eq!(compressed.len(), history.len(), "no turn was dropped");
    let first_text = compressed[0].parts[0].as_text().unwrap();
    assert!(!first_text.contains("[earlier conversation compressed]"));
    assert!(
        first_text.contains("...[truncated]..."),
        "older long text is truncated with an explicit marker"
    );
}

#[test]
fn truncation_keeps_head_and_tail() {
    let compressor = compressor(600);
    let mut history = vec![Content::user(format!(
        "OPENING {} CLOSING",
        "z".repeat(4000)
    ))];
    history.extend(history_of(1, 800));

    let compressed = compressor.compress(&history);
    let text = compressed
        .iter()
        .find_map(|turn| turn.parts[0].as_text().filter(|t| t.contains("OPENING")))
        .expect("lightly shortened older turn should survive");
    assert!(text.contains("...[truncated]..."));
    assert!(text.starts_with("OPENING"));
    assert!(text.ends_with("CLOSING"));
}

#[test]
fn tool_calls_survive_when_preserved() {
    let compressor = HistoryCompressor::new(
        CompressionConfig::new()
            .max_tokens(250)
            .chars_per_token(4)
            .preserve_recent_turns(1)
            .preserve_tool_calls(true)
            .truncate_length(40),
    );
    let mut history = vec![
        Content::function_call("run_tests", serde_json::json!({"filter": "cache"})),
        Content::function_response("run_tests", serde_json::json!({"passed": 12, "failed": 0})),
    ];
    history.extend(history_of(8, 300));

    let compressed = compressor.compress(&history);
    assert!(compressed.len() < history.len(), "history was compressed");
    let tool_parts_survive = compressed
        .iter()
        .any(|turn| turn.parts.iter().any(Part::is_tool_part));
    assert!(
        tool_parts_survive,
        "with preserve_tool_calls, the tool round-trip survives compression"
    );
}

#[test]
fn tool_parts_dropped_under_aggressive_shortening() {
    let compressor = HistoryCompressor::new(
        CompressionConfig::new()
            .max_tokens(250)
            .chars_per_token(4)
            .preserve_recent_turns(1)
            .preserve_tool_calls(false)
            .truncate_length(40),
    );
    let mut history = vec![Content {
        role: garmr::Role::Model,
        parts: vec![
            Part::Text("running the test suite".into()),
            Part::FunctionCall {
                name: "run_tests".into(),
                args: serde_json::json!({"filter": "x".repeat(2000)}),
            },
        ],
    }];
    history.extend(history_of(2, 300));

    let compressed = compressor.compress(&history);
    let any_tool_part = compressed
        .iter()
        .take(compressed.len() - 2) // older span only
        .any(|turn| turn.parts.iter().any(Part::is_tool_part));
    assert!(!any_tool_part, "aggressive shortening drops tool parts");
}

#[test]
fn ordering_is_never_changed() {
    let compressor = compressor(300);
    let history = history_of(12, 400);
    let compressed = compressor.compress(&history);

    // Every kept user tag must appear in its original relative order.
    let tags: Vec<String> = compressed
        .iter()
        .filter_map(|turn| turn.parts.first().and_then(|p| p.as_text()))
        .filter_map(|text| text.split('-').next().map(str::to_string))
        .filter(|tag| tag.starts_with('u') || tag.starts_with('m'))
        .collect();
    let mut sorted = tags.clone();
    sorted.sort_by_key(|tag| {
        let n: usize = tag[1..].parse().unwrap_or(0);
        n * 2 + usize::from(tag.starts_with('m'))
    });
    assert_eq!(tags, sorted);
}

// =========================================================================
// Stats and reconfiguration
// =========================================================================

#[test]
fn stats_report_reduction() {
    let compressor = compressor(200);
    let history = history_of(20, 800);
    let compressed = compressor.compress(&history);

    let stats = compressor.compression_stats(&history, &compressed);
    assert!(stats.original_tokens > stats.compressed_tokens);
    assert!(stats.reduction_percent > 0.0);
    assert_eq!(stats.turns_removed, history.len() - compressed.len());
}

#[test]
fn stats_on_identical_histories_are_zero() {
    let compressor = compressor(10_000);
    let history = history_of(2, 40);
    let stats = compressor.compression_stats(&history, &history);
    assert_eq!(stats.reduction_percent, 0.0);
    assert_eq!(stats.turns_removed, 0);
}

#[test]
fn set_options_changes_budget() {
    let compressor = compressor(10_000);
    let history = history_of(10, 400);
    assert!(!compressor.needs_compression(&history));

    compressor.set_options(CompressionUpdate {
        max_tokens: Some(50),
        ..Default::default()
    });
    assert!(compressor.needs_compression(&history));
}
