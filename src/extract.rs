//! Structured-payload extraction from free-form model output.
//!
//! Every model-call site that expects structured content goes through this
//! module, so the failure modes stay enumerable: no payload at all,
//! malformed JSON, or JSON of the wrong top-level shape.

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("no payload found in model output")]
    NoPayload,

    #[error("malformed JSON in model output: {0}")]
    MalformedJson(String),

    #[error("expected {expected} at top level, got {actual}")]
    WrongShape {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Remove a single surrounding markdown code fence.
///
/// Handles both language-tagged (```json, ```cypher) and bare fences by
/// dropping the first and last lines when a leading fence marker is
/// detected. Text without a leading fence is returned trimmed, unchanged.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() <= 2 {
        return String::new();
    }
    lines[1..lines.len() - 1].join("\n")
}

/// Drop any trailing prose after the final occurrence of `closer`.
///
/// Models sometimes follow a JSON array with commentary; everything after
/// the last `]` is noise. Text without the closer is returned as-is.
pub fn truncate_after_last(text: &str, closer: char) -> &str {
    match text.rfind(closer) {
        Some(idx) => &text[..idx + closer.len_utf8()],
        None => text,
    }
}

/// Parse a model response that must be a JSON array of strings.
///
/// Sanitizes first (fence strip, truncate after the final `]`), then
/// parses, then checks the shape: anything other than an array of strings
/// is an error.
pub fn parse_string_array(response: &str) -> std::result::Result<Vec<String>, ExtractError> {
    let unfenced = strip_code_fence(response);
    let payload = truncate_after_last(&unfenced, ']').trim().to_string();

    if payload.is_empty() {
        return Err(ExtractError::NoPayload);
    }

    let value: Value =
        serde_json::from_str(&payload).map_err(|e| ExtractError::MalformedJson(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(ExtractError::WrongShape {
                expected: "array of strings",
                actual: json_kind(&other),
            })
        }
    };

    let mut names = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => names.push(s),
            other => {
                return Err(ExtractError::WrongShape {
                    expected: "array of strings",
                    actual: json_kind(&other),
                })
            }
        }
    }
    Ok(names)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
