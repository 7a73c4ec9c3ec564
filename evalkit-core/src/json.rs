//! Tolerant JSON extraction from model responses
//!
//! Models frequently wrap a JSON document in a markdown code fence, sometimes
//! with a language tag and surrounding prose. Extraction runs in two stages:
//!
//! 1. [`extract_json_block`] normalizes the text, slicing out the outermost
//!    `{ ... }` region when the response opens with a fence.
//! 2. [`parse_json_object`] strictly parses that candidate and reports why it
//!    failed.
//!
//! [`parse_json_response`] combines both and substitutes an empty object on
//! failure, which is what every caller in this crate wants.

use serde_json::{Map, Value};

/// A parsed JSON object with insertion order preserved.
pub type JsonObject = Map<String, Value>;

const FENCE: &str = "```";

/// Failure of the strict parse stage
#[derive(Debug, thiserror::Error)]
pub enum JsonExtractError {
    #[error("no JSON content")]
    Empty,

    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Locate the JSON document inside raw model text.
///
/// Surrounding whitespace is always trimmed. When the text starts with a
/// markdown fence, the slice from the first `{` to the last `}` (inclusive)
/// is returned. Unfenced text is returned as-is.
pub fn extract_json_block(text: &str) -> &str {
    let text = text.trim();

    if text.starts_with(FENCE) {
        if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
            if end > start {
                return &text[start..=end];
            }
        }
    }

    text
}

/// Strictly parse a JSON object out of model text.
pub fn parse_json_object(text: &str) -> Result<JsonObject, JsonExtractError> {
    let candidate = extract_json_block(text);
    if candidate.is_empty() {
        return Err(JsonExtractError::Empty);
    }

    match serde_json::from_str::<Value>(candidate)? {
        Value::Object(map) => Ok(map),
        other => Err(JsonExtractError::NotAnObject(value_kind(&other))),
    }
}

/// Parse a JSON object out of model text, yielding an empty object on any
/// failure.
pub fn parse_json_response(text: &str) -> JsonObject {
    parse_json_object(text).unwrap_or_else(|e| {
        tracing::debug!("Falling back to empty JSON object: {}", e);
        JsonObject::new()
    })
}

/// Render a scalar JSON value for human-readable output.
///
/// Strings are emitted without quotes; everything else uses its JSON text.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
