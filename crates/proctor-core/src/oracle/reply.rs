//! Oracle reply normalization and token extraction.
//!
//! The oracle is advisory and untrusted: its reply arrives as free text
//! in one of several wire shapes, and parsing must be total — any
//! non-empty reply resolves to one of the three decision tokens, never an
//! error. Shape sniffing is confined to [`normalize_reply`]; everything
//! downstream operates on plain text.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::domain::{Decision, DecisionResult, MAX_REASON_CHARS};

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(END_EXAM|FLASH_WARNING|IGNORE)\b").expect("static token pattern")
});

/// Reduce any oracle response shape to plain text.
///
/// Handles, in order: a plain string; `{content}`; `{text}`; nested
/// `generations` lists (`[[{text}]]` or `[{text}]`); chat-completions
/// `{choices: [{message: {content}}]}`. Anything else falls back to the
/// JSON stringification of the whole value.
pub fn normalize_reply(value: &Value) -> String {
    if let Value::String(s) = value {
        return s.clone();
    }
    if let Some(s) = value.get("content").and_then(Value::as_str) {
        return s.to_string();
    }
    if let Some(s) = value.get("text").and_then(Value::as_str) {
        return s.to_string();
    }
    if let Some(generations) = value.get("generations").and_then(Value::as_array) {
        let first = generations.first();
        let candidate = match first {
            Some(Value::Array(inner)) => inner.first(),
            other => other,
        };
        if let Some(s) = candidate.and_then(|g| g.get("text")).and_then(Value::as_str) {
            return s.to_string();
        }
        return value.to_string();
    }
    if let Some(s) = value
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
    {
        return s.to_string();
    }
    value.to_string()
}

/// Parse a normalized reply into a [`DecisionResult`].
///
/// Token precedence:
/// 1. word-boundary match on the first non-blank line (case-insensitive);
/// 2. first occurrence anywhere in the full text;
/// 3. keyword heuristics on the lowercased text;
/// 4. `IGNORE` as the universal fallback.
///
/// The reason is the remaining lines joined, or — for single-line
/// replies — the text with the token removed, cut at the first sentence
/// boundary and capped at [`MAX_REASON_CHARS`].
pub fn parse_decision(raw: &str) -> DecisionResult {
    let text = raw.trim();
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let decision = lines
        .first()
        .and_then(|line| find_token(line))
        .or_else(|| find_token(text))
        .unwrap_or_else(|| keyword_fallback(text));

    let reason = if lines.len() > 1 {
        Some(lines[1..].join(" "))
    } else {
        let remainder = remove_token_once(text, decision.token());
        let remainder = remainder.trim();
        if remainder.is_empty() {
            None
        } else {
            Some(first_sentence(remainder).to_string())
        }
    };

    // `raw` is retained unmodified for audit.
    DecisionResult::new(decision, reason, raw)
}

fn find_token(text: &str) -> Option<Decision> {
    TOKEN_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

fn keyword_fallback(raw: &str) -> Decision {
    let lower = raw.to_lowercase();
    if ["end", "terminate", "suspend"].iter().any(|k| lower.contains(k)) {
        Decision::EndExam
    } else if ["warning", "flash", "alert"].iter().any(|k| lower.contains(k)) {
        Decision::FlashWarning
    } else {
        Decision::Ignore
    }
}

/// Remove the first case-insensitive occurrence of `token` from `text`.
///
/// Tokens are ASCII, so matched byte ranges are always char boundaries.
fn remove_token_once(text: &str, token: &str) -> String {
    let hay = text.as_bytes();
    let needle = token.as_bytes();
    if needle.is_empty() || hay.len() < needle.len() {
        return text.to_string();
    }
    for i in 0..=hay.len() - needle.len() {
        if hay[i..i + needle.len()].eq_ignore_ascii_case(needle) {
            let mut out = String::with_capacity(text.len() - needle.len());
            out.push_str(&text[..i]);
            out.push_str(&text[i + needle.len()..]);
            return out;
        }
    }
    text.to_string()
}

/// Cut at the first `.`/`?`/`!` followed by whitespace.
fn first_sentence(text: &str) -> &str {
    let bytes = text.as_bytes();
    for i in 0..bytes.len() {
        if matches!(bytes[i], b'.' | b'?' | b'!')
            && bytes.get(i + 1).is_some_and(|c| c.is_ascii_whitespace())
        {
            return &text[..i];
        }
    }
    text
}
