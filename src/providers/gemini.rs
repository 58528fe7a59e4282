//! Minimal Gemini client for our use-cases.
//!
//! We only call `models/{model}:generateContent` with a single user turn and return
//! the candidate text as-is. Calls are instrumented and log model names, latencies,
//! and token usage (not contents).
//!
//! NOTE: the API key travels in a header, never in the URL, so it cannot end up
//! in request logs.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use super::{read_success_body, ProviderError, TextGenerator};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub temperature: f32,
}

impl Gemini {
  /// Construct the client if we find GEMINI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

    let client = match reqwest::Client::builder().timeout(Duration::from_secs(30)).build() {
      Ok(c) => c,
      Err(e) => {
        error!(target: "upstream", error = %e, "Failed to build HTTP client for Gemini");
        return None;
      }
    };

    Some(Self { client, api_key, base_url, model, temperature: 0.9 })
  }

  fn endpoint(&self) -> String {
    format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
  }
}

#[async_trait]
impl TextGenerator for Gemini {
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
    let req = GenerateContentRequest {
      contents: vec![Content { role: "user".into(), parts: vec![Part { text: Some(prompt.to_string()) }] }],
      generation_config: GenerationConfig { temperature: self.temperature },
    };

    let start = Instant::now();
    let res = self
      .client
      .post(self.endpoint())
      .header(USER_AGENT, "pte-practice-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", &self.api_key)
      .json(&req)
      .send()
      .await?;
    let body = read_success_body(res).await?;
    let elapsed = start.elapsed();

    let parsed: GenerateContentResponse =
      serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    if let Some(usage) = &parsed.usage_metadata {
      info!(target: "upstream", ?elapsed, prompt_tokens = ?usage.prompt_token_count, completion_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    candidate_text(parsed)
  }

  fn model_id(&self) -> &str {
    &self.model
  }
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(res: GenerateContentResponse) -> Result<String, ProviderError> {
  let candidate = res.candidates.into_iter().next().ok_or_else(|| {
    let reason = res
      .prompt_feedback
      .and_then(|f| f.block_reason)
      .unwrap_or_else(|| "no candidates".into());
    ProviderError::Parse(format!("Gemini returned no candidate ({reason})"))
  })?;
  let text: String = candidate
    .content
    .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
    .unwrap_or_default();
  if text.trim().is_empty() {
    let reason = candidate.finish_reason.unwrap_or_else(|| "empty".into());
    return Err(ProviderError::Parse(format!("Gemini candidate has no text ({reason})")));
  }
  Ok(text)
}

// --- Gemini DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  generation_config: GenerationConfig,
}
#[derive(Serialize, Deserialize)]
struct Content {
  #[serde(default)]
  role: String,
  #[serde(default)]
  parts: Vec<Part>,
}
#[derive(Serialize, Deserialize)]
struct Part {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  text: Option<String>,
}
#[derive(Serialize)]
struct GenerationConfig {
  temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  #[serde(default)]
  prompt_feedback: Option<PromptFeedback>,
  #[serde(default)]
  usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  #[serde(default)]
  content: Option<Content>,
  #[serde(default)]
  finish_reason: Option<String>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
  #[serde(default)]
  block_reason: Option<String>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)]
  prompt_token_count: Option<u32>,
  #[serde(default)]
  candidates_token_count: Option<u32>,
  #[serde(default)]
  total_token_count: Option<u32>,
}
