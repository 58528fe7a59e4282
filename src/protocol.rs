//! HTTP request/response DTOs (serde ready).
//! Field names are camelCase where the frontend already expects them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct TopicQuery {
  pub topic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TextOut {
  pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PromptOut {
  pub prompt: String,
}

//
// Evaluation bodies. Every field defaults so a missing one is reported as a
// validation error rather than a deserialization failure.
//

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SpokenEvalIn {
  pub transcript: String,
  #[serde(rename = "originalText")]
  pub original_text: String,
  #[serde(rename = "taskType")]
  pub task_type: String,
  #[serde(rename = "correctAnswer")]
  pub correct_answer: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EssayEvalIn {
  pub prompt: String,
  #[serde(rename = "essayText")]
  pub essay_text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SwtEvalIn {
  #[serde(rename = "originalText")]
  pub original_text: String,
  #[serde(rename = "summaryText")]
  pub summary_text: String,
}
