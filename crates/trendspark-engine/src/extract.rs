//! JSON object extraction from model output
//!
//! Models asked for "JSON only" still wrap answers in code fences or add a
//! sentence of preamble. This module peels that off and decodes the object.
//! Nothing here returns an error: `None` is the normal not-found result.

use serde_json::{Map, Value};

/// Remove a leading ```` ``` ```` fence (with optional language tag) and a
/// trailing ```` ``` ```` fence, then trim.
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.find('\n') {
            Some(newline) if is_fence_tag(&rest[..newline]) => &rest[newline + 1..],
            _ => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-'),
        };
    }

    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }

    body.trim()
}

fn is_fence_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
}

/// Decode the first `{ ... }` object found in `text`.
///
/// The greedy span from the first `{` to the last `}` is tried first. When
/// that does not decode (trailing prose containing a brace, two objects in a
/// row) the first balanced object is tried instead.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return None;
    }

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }

    if let Some(map) = decode_object(&body[start..=end]) {
        return Some(map);
    }

    let balanced = balanced_object_span(body, start)?;
    let decoded = decode_object(balanced);
    if decoded.is_none() {
        tracing::debug!(
            "Could not decode JSON object from model response ({} bytes)",
            text.len()
        );
    }
    decoded
}

fn decode_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn balanced_object_span(s: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, c) in s[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
