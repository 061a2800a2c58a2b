//! Text-Field Parser.
//!
//! Turns free-form oracle text into scores, lists and labeled sections.
//! Nothing here returns an error: a field that cannot be found is reported
//! as [`Extracted::Missing`] and every public convenience accessor resolves
//! it to a documented default.

mod script;
mod sections;

pub use script::*;
pub use sections::*;

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Score substituted when a 0.0-1.0 score cannot be parsed.
pub const NEUTRAL_UNIT_SCORE: f64 = 0.5;

/// Score substituted when a 0-100 panel score cannot be parsed.
pub const NEUTRAL_PANEL_SCORE: u32 = 50;

static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid decimal regex"));

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+").expect("valid list marker regex")
});

/// A field that was either present in the oracle text or absent.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    Found(T),
    Missing,
}

impl<T> Extracted<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Extracted::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Extracted::Found(value) => Some(value),
            Extracted::Missing => None,
        }
    }

    /// Resolve to the value, or `default` when missing.
    pub fn value_or(self, default: T) -> T {
        self.found().unwrap_or(default)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Extracted<U> {
        match self {
            Extracted::Found(value) => Extracted::Found(f(value)),
            Extracted::Missing => Extracted::Missing,
        }
    }
}

impl<T: Default> Extracted<T> {
    pub fn value_or_default(self) -> T {
        self.found().unwrap_or_default()
    }
}

/// First decimal token in `text` that lies within 0.0-1.0.
pub fn find_unit_score(text: &str) -> Extracted<f64> {
    DECIMAL
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .find(|value| (0.0..=1.0).contains(value))
        .map_or(Extracted::Missing, Extracted::Found)
}

/// Parse a 0.0-1.0 score, falling back to [`NEUTRAL_UNIT_SCORE`].
pub fn unit_score(text: &str) -> f64 {
    match find_unit_score(text) {
        Extracted::Found(score) => score,
        Extracted::Missing => {
            warn!(
                response_preview = %preview(text),
                default = NEUTRAL_UNIT_SCORE,
                "No unit score in oracle response, using neutral default"
            );
            NEUTRAL_UNIT_SCORE
        }
    }
}

/// Extract JSON from a completion string, handling markdown code blocks.
///
/// Attempts extraction in this order:
/// 1. Raw JSON (fast path)
/// 2. ```json ... ``` code blocks
/// 3. ``` ... ``` code blocks
pub fn extract_json_from_completion(completion: &str) -> Result<&str, String> {
    let trimmed = completion.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }

    if completion.contains("```json") {
        return completion
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ```json block but content was empty or malformed".to_string());
    }

    if completion.contains("```") {
        return completion
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ``` block but content was empty or malformed".to_string());
    }

    Err(format!(
        "No JSON found in response. First 100 chars: '{}'",
        completion.chars().take(100).collect::<String>()
    ))
}

/// Parse up to `max` non-empty strings from a list response.
///
/// The structured form is a JSON array of strings (optionally fenced). When
/// that fails the text is split into lines, list markers are stripped and
/// the first `max` non-empty lines are kept.
pub fn parse_string_list(text: &str, max: usize) -> Vec<String> {
    let structured = extract_json_from_completion(text)
        .ok()
        .and_then(|json| serde_json::from_str::<Vec<String>>(json).ok());

    let items: Vec<String> = match structured {
        Some(items) => items.into_iter().map(|s| s.trim().to_string()).collect(),
        None => {
            warn!(
                response_preview = %preview(text),
                "List response was not a JSON array, splitting on lines"
            );
            text.lines()
                .map(|line| LIST_MARKER.replace(line, "").trim().to_string())
                .filter(|line| !line.starts_with("```"))
                .collect()
        }
    };

    items
        .into_iter()
        .filter(|item| !item.is_empty())
        .take(max)
        .collect()
}

/// First 200 characters of a response, for log fields.
pub(crate) fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}
