//! Post-processing: deterministic cleanup of model output and page text.
//!
//! Even when told to return bare JSON, models sometimes wrap it in
//! ` ```json ... ``` ` fences or prepend a sentence. These rules recover the
//! JSON object without touching its content. They never repair the JSON
//! itself: a truncated or invalid object still fails validation.

use crate::contract::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*\n(.*?)\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> &str {
    match RE_OUTER_FENCES.captures(input) {
        Some(caps) => caps.get(1).map_or(input, |m| m.as_str()),
        None => input,
    }
}

// ── Rule 2: Cut surrounding prose ────────────────────────────────────────────

fn outermost_object(input: &str) -> &str {
    match (input.find('{'), input.rfind('}')) {
        (Some(start), Some(end)) if start < end => &input[start..=end],
        _ => input,
    }
}

// ── Rule 3: Strip invisible Unicode ──────────────────────────────────────────

static RE_INVISIBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{200B}\u{200C}\u{200D}\u{2060}\u{FEFF}]").unwrap());

/// Recover and parse the JSON value in a raw model response.
///
/// A body that already parses is returned as is, whatever its root type, so
/// an array or scalar answer fails contract validation at the root. Prose is
/// only cut away when the body does not parse and is not an array.
pub fn parse_json_response(raw: &str) -> Result<Value, ValidationError> {
    let cleaned = RE_INVISIBLE.replace_all(raw.trim(), "");
    let body = strip_code_fences(cleaned.trim()).trim();
    let malformed = |e: serde_json::Error| ValidationError::malformed(e.to_string());
    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(e) if body.starts_with('[') => Err(malformed(e)),
        Err(_) => serde_json::from_str(outermost_object(body)).map_err(malformed),
    }
}

// ── Page text ────────────────────────────────────────────────────────────────

static RE_WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Join one page's text items with single spaces, collapsing inner runs.
pub fn join_page_items<S: AsRef<str>>(items: &[S]) -> String {
    let joined = items
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    RE_WHITESPACE_RUN.replace_all(&joined, " ").into_owned()
}

/// Join page texts with newlines, in page order, and trim the result.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
