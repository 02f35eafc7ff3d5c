//! Extraction of structured payloads from oracle responses
//!
//! Models wrap answers in markdown fences, prepend prose, or append
//! commentary. The extractors here pull out the first usable payload
//! and leave interpretation to the caller; a response with no payload
//! yields `None`, never an error.

use serde::de::DeserializeOwned;

/// Extract the first balanced JSON object from a response.
///
/// Scans for `{`, then walks to the matching close brace, honoring
/// string literals and escapes. Works whether or not the object sits
/// inside a code fence.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let bytes = response.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&response[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Extract and parse the first JSON object from a response
pub fn parse_json_object<T: DeserializeOwned>(response: &str) -> Option<T> {
    let block = extract_json_object(response)?;
    serde_json::from_str(block).ok()
}

/// Extract a code snippet from a response that may contain markdown
/// fences, explanations, or multiple code blocks. Returns the first
/// fenced block with its language tag stripped, or the trimmed
/// response when no fence is present.
pub fn extract_code_block(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        // Skip language tag (e.g. "python\n")
        let code_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        if let Some(end) = after_fence[code_start..].find("```") {
            return after_fence[code_start..code_start + end].trim().to_string();
        }
    }

    trimmed
        .trim_start_matches("```python")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .to_string()
}
