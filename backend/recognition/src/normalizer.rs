//! Safety/response normalizer: map raw provider prose to an `ItemGuess`.
//!
//! Provider output format is not contractually fixed, so extraction is a
//! deterministic, documented heuristic rather than strict schema validation:
//!
//! 1. Strip markdown code fences.
//! 2. If the text contains a JSON object, read the label from the first of
//!    `main_object`, `item`, `label`, `name`; an optional numeric
//!    `confidence` is clamped to [0, 1].
//! 3. Otherwise take the first non-empty line, strip leading list markers
//!    and `Label:`-style prefixes, collapse whitespace, and title-case it.
//! 4. An empty or implausibly long (> 120 chars) label is `Malformed`.
//!
//! Safety refusals never reach this module; provider adapters classify them
//! as `SafetyBlocked` before any parsing happens.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use shelfscan_core::{ItemGuess, ProviderError};

/// Longest label we accept; anything longer is prose, not a label.
const MAX_LABEL_CHARS: usize = 120;

/// JSON keys consulted for the item label, in priority order.
const LABEL_KEYS: [&str; 4] = ["main_object", "item", "label", "name"];

static FENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*```[a-zA-Z0-9_-]*\s*$").unwrap());

/// Leading list markers and `Item:`-style prefixes on the first line.
static PREFIX_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:[-*•]\s*|\d+[.)]\s*)?(?:(?:item|label|object|answer)\s*[:\-]\s*)?")
        .unwrap()
});

/// Normalize one raw provider response into an `ItemGuess`.
pub fn normalize_response(raw: &str) -> Result<ItemGuess, ProviderError> {
    let stripped = FENCE_PATTERN.replace_all(raw, "");

    if let Some(guess) = extract_from_json(&stripped, raw) {
        return Ok(guess);
    }

    let line = stripped
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| ProviderError::Malformed("empty response".to_string()))?;

    let label = title_case(&collapse_whitespace(&PREFIX_PATTERN.replace(line, "")));
    if label.is_empty() {
        return Err(ProviderError::Malformed(format!(
            "no label found in line {line:?}"
        )));
    }
    if label.chars().count() > MAX_LABEL_CHARS {
        return Err(ProviderError::Malformed(format!(
            "first line too long to be a label ({} chars)",
            label.chars().count()
        )));
    }

    Ok(ItemGuess::new(label, raw))
}

/// Try to read a label (and confidence) from an embedded JSON object.
fn extract_from_json(text: &str, raw: &str) -> Option<ItemGuess> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let value: Value = serde_json::from_str(&text[start..=end]).ok()?;
    let object = value.as_object()?;

    let label = LABEL_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.chars().count() <= MAX_LABEL_CHARS)?;

    let mut guess = ItemGuess::new(title_case(&collapse_whitespace(label)), raw);
    if let Some(confidence) = object.get("confidence").and_then(Value::as_f64) {
        guess = guess.with_confidence(confidence as f32);
    }
    Some(guess)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
