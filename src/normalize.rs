//! Response normalization: raw model text in, validated value out.
//!
//! Model output is untrusted. Models wrap JSON in markdown fences even when told
//! not to, so fences are stripped before any parsing. Nothing here retries; callers
//! decide between surfacing the error and serving a fallback.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::util::trunc_for_log;

const LOG_PREVIEW_BYTES: usize = 400;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
  #[error("response is not valid JSON: {0}")]
  InvalidJson(String),
  #[error("response JSON is not an object")]
  NotAnObject,
  #[error("response is missing required keys: {}", .0.join(", "))]
  MissingKeys(Vec<String>),
  #[error("response object has the wrong field types: {0}")]
  WrongTypes(String),
  /// Parsed fine but cannot be used for the exercise.
  #[error("response is unusable: {0}")]
  Unusable(String),
}

/// Plain text: fences stripped, whitespace trimmed.
pub fn normalize_text(raw: &str) -> String {
  strip_code_fences(raw)
}

/// One entry per non-blank line, in order.
pub fn normalize_sentences(raw: &str) -> Vec<String> {
  split_sentences(&strip_code_fences(raw))
}

/// A JSON object carrying every `required` key with a non-null value.
pub fn normalize_object(raw: &str, required: &[&str]) -> Result<Map<String, Value>, FormatError> {
  let cleaned = strip_code_fences(raw);
  let result = parse_object(&cleaned).and_then(|obj| {
    check_required(&obj, required)?;
    Ok(obj)
  });
  if let Err(e) = &result {
    warn!(target: "upstream", error = %e, raw = %trunc_for_log(raw, LOG_PREVIEW_BYTES), "Model response failed normalization");
  }
  result
}

/// Normalize into an object, then deserialize it into `T`.
pub fn normalize_into<T: DeserializeOwned>(raw: &str, required: &[&str]) -> Result<T, FormatError> {
  let obj = normalize_object(raw, required)?;
  serde_json::from_value(Value::Object(obj)).map_err(|e| {
    warn!(target: "upstream", error = %e, raw = %trunc_for_log(raw, LOG_PREVIEW_BYTES), "Model JSON has unexpected field types");
    FormatError::WrongTypes(e.to_string())
  })
}

/// Trim and drop every ```` ```json ```` / ```` ``` ```` marker, wherever it sits.
pub fn strip_code_fences(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  let mut rest = raw.trim();
  while let Some(pos) = rest.find("```") {
    out.push_str(&rest[..pos]);
    rest = &rest[pos + 3..];
    // Language tag directly after an opening fence.
    let tag_len = rest
      .find(|c: char| !c.is_ascii_alphanumeric())
      .unwrap_or(rest.len());
    if rest[..tag_len].eq_ignore_ascii_case("json") {
      rest = &rest[tag_len..];
    }
  }
  out.push_str(rest);
  out.trim().to_string()
}

fn split_sentences(cleaned: &str) -> Vec<String> {
  cleaned
    .lines()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .map(str::to_string)
    .collect()
}

fn parse_object(cleaned: &str) -> Result<Map<String, Value>, FormatError> {
  let value = serde_json::from_str::<Value>(cleaned).map_err(|e| FormatError::InvalidJson(e.to_string()))?;
  match value {
    Value::Object(obj) => Ok(obj),
    _ => Err(FormatError::NotAnObject),
  }
}

fn check_required(obj: &Map<String, Value>, required: &[&str]) -> Result<(), FormatError> {
  let missing: Vec<String> = required
    .iter()
    .filter(|k| obj.get(**k).map_or(true, Value::is_null))
    .map(|k| k.to_string())
    .collect();
  if missing.is_empty() {
    Ok(())
  } else {
    Err(FormatError::MissingKeys(missing))
  }
}
