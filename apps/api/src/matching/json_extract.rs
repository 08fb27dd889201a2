//! Recovers a JSON object from model output that may carry prose or code fences.
//!
//! Two tiers: the greedy span from the first `{` to the last `}`, then the whole
//! text. Anything else is `MalformedModelOutput`; nothing partial is ever returned.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Longest raw excerpt carried in the error.
const RAW_EXCERPT_CHARS: usize = 1000;

static OBJECT_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex is valid"));

#[derive(Debug, Error)]
#[error("Failed to parse JSON from model response. Raw response: {raw}")]
pub struct MalformedModelOutput {
    /// First 1000 characters of the model output.
    pub raw: String,
}

impl MalformedModelOutput {
    fn from_raw(raw: &str) -> Self {
        Self {
            raw: raw.chars().take(RAW_EXCERPT_CHARS).collect(),
        }
    }
}

/// Extracts the single JSON value embedded in `raw`.
pub fn extract_json(raw: &str) -> Result<Value, MalformedModelOutput> {
    if let Some(span) = OBJECT_SPAN.find(raw) {
        if let Ok(value) = serde_json::from_str(span.as_str()) {
            return Ok(value);
        }
    }

    serde_json::from_str(raw.trim()).map_err(|_| MalformedModelOutput::from_raw(raw))
}
