//! Tolerant JSON payload extraction from free-form agent text.

use serde_json::{Map, Value};

use crate::error::{ExtractError, ExtractionResult};

const FENCE: &str = "```";

/// Keeps only the interior of a leading code fence, if a closing fence exists.
///
/// The opening line may carry a language tag (```` ```json ````).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix(FENCE) else {
        return text;
    };
    let body_start = match after_open.find('\n') {
        Some(i) => i + 1,
        None => return text,
    };
    let body = &after_open[body_start..];
    match body.rfind(FENCE) {
        Some(end) => body[..end].trim(),
        None => text,
    }
}

/// Escapes raw CR/LF characters that appear inside JSON string literals.
///
/// Structural whitespace outside strings is left untouched, and escape
/// sequences inside strings are honored so `\"` does not end the string.
pub fn normalize_string_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if !in_string {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
            continue;
        }

        if escaped {
            escaped = false;
            out.push(ch);
            continue;
        }

        match ch {
            '\\' => {
                escaped = true;
                out.push(ch);
            }
            '"' => {
                in_string = false;
                out.push(ch);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

fn opens_with_json_token(s: &str) -> bool {
    s.starts_with('{')
        || s.starts_with('[')
        || s.starts_with('"')
        || s.starts_with("null")
        || s.starts_with("true")
        || s.starts_with("false")
}

fn parse_str(s: &str) -> ExtractionResult<Value> {
    serde_json::from_str::<Value>(s).map_err(|e| ExtractError::InvalidJson(e.to_string()))
}

/// Fence stripping, newline normalization, then direct or fallback parse.
///
/// A direct-parse syntax error is reported as-is and never masked by the
/// fallback `{ ... }` search.
pub fn extract_json_value(text: &str) -> ExtractionResult<Value> {
    if text.trim().is_empty() {
        return Err(ExtractError::Empty);
    }

    let unfenced = strip_code_fence(text);
    let normalized = normalize_string_newlines(unfenced);
    let candidate = normalized.trim();
    if candidate.is_empty() {
        return Err(ExtractError::Empty);
    }

    if opens_with_json_token(candidate) {
        return parse_str(candidate);
    }

    let start = candidate.find('{');
    let end = candidate.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if e > s => parse_str(&candidate[s..=e]),
        _ => Err(ExtractError::NoJsonObject),
    }
}

fn version_matches(v: Option<&Value>, supported: u64) -> bool {
    match v {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(u) => u == supported,
            None => n.as_f64() == Some(supported as f64),
        },
        _ => false,
    }
}

/// Extracts a JSON object whose `version` equals `supported` exactly.
pub fn extract_versioned_object(text: &str, supported: u64) -> ExtractionResult<Map<String, Value>> {
    let value = extract_json_value(text)?;
    let Value::Object(obj) = value else {
        return Err(ExtractError::JsonNotObject);
    };
    if !version_matches(obj.get("version"), supported) {
        return Err(ExtractError::UnsupportedVersion);
    }
    Ok(obj)
}
