// Structured-output decoding
//
// Models are asked for bare JSON but routinely wrap it in markdown fences or
// prefix it with a <think> block. These helpers peel that off and decode into
// a static type. Any mismatch is a MalformedResponse; nothing is patched up.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::errors::GatewayError;

static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>\s*").expect("valid think-block regex"));

/// How much of the raw reply to keep in a decode error
const RAW_PREVIEW: usize = 160;

/// Remove `<think>...</think>` reasoning preambles.
pub fn strip_think_blocks(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").trim().to_string()
}

/// Strip a surrounding ```json ... ``` (or bare ```) fence, if present.
pub fn strip_markdown_fences(s: &str) -> &str {
    let s = s.trim();
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop the info string ("json", "JSON", ...) up to the first newline
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Decode a model reply into `T`.
///
/// Tries the cleaned text directly, then the outermost JSON object or array
/// embedded in it. Reports the first (direct) decode error on failure, since
/// that is the one that names the missing or mistyped field.
pub fn decode_json<T: DeserializeOwned>(text: &str, backend: &str) -> Result<T, GatewayError> {
    let cleaned = strip_think_blocks(text);
    let candidate = strip_markdown_fences(&cleaned);

    if candidate.is_empty() {
        return Err(GatewayError::malformed(backend, "reply was empty"));
    }

    let direct_err = match serde_json::from_str::<T>(candidate) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (candidate.find(open), candidate.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str::<T>(&candidate[start..=end]) {
                    return Ok(value);
                }
            }
        }
    }

    let preview: String = candidate.chars().take(RAW_PREVIEW).collect();
    Err(GatewayError::malformed(
        backend,
        format!("{} (reply began: {:?})", direct_err, preview),
    ))
}
