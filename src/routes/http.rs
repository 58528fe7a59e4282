//! HTTP endpoint handlers. Thin wrappers: extract, forward to `logic`, wrap the payload.
//! Failures are `AppError`s, which render as `{"error": "..."}` with the right status.

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
  extract::{
    multipart::{Multipart, MultipartRejection},
    rejection::JsonRejection,
    Path, Query, State,
  },
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::domain::{
  EvaluationRequest, EvaluationResult, ImageResult, McsaQuestion, ReorderExercise, RubricKind, ShortAnswerQuestion,
  TaskKind,
};
use crate::error::{AppError, ErrorOut};
use crate::logic::{self, AudioUpload};
use crate::protocol::*;
use crate::providers::AudioEncoding;
use crate::state::AppState;

const DEFAULT_SAMPLE_RATE_HZ: u32 = 48_000;

pub async fn http_index() -> &'static str {
  "PTE Practice Platform Backend is running!"
}

pub async fn http_not_found() -> impl IntoResponse {
  (StatusCode::NOT_FOUND, Json(ErrorOut { error: "Not found".into() }))
}

//
// Generation
//

/// Read Aloud, Repeat Sentence, Essay and Summarize Written Text share one route.
/// Other slugs fall back to a generic sentence; structured kinds reached through
/// an odd spelling (`/api/generate/MCSA`) are a 404.
#[instrument(level = "info", skip(state))]
pub async fn http_generate_text(
  State(state): State<Arc<AppState>>,
  Path(task): Path<String>,
  Query(q): Query<TopicQuery>,
) -> Result<Response, AppError> {
  let kind = TaskKind::from_slug(&task);
  if kind.is_some_and(|k| !k.is_plain_text()) {
    return Ok(http_not_found().await.into_response());
  }
  let topic = state.topic_or_default(q.topic.as_deref());
  let text = logic::generate_plain_text(&state, &task, topic).await?;
  Ok(match kind {
    Some(TaskKind::Essay) => Json(PromptOut { prompt: text }).into_response(),
    _ => Json(TextOut { text }).into_response(),
  })
}

#[instrument(level = "info", skip(state))]
pub async fn http_generate_reorder(
  State(state): State<Arc<AppState>>,
  Query(q): Query<TopicQuery>,
) -> Result<Json<ReorderExercise>, AppError> {
  let topic = state.topic_or_default(q.topic.as_deref());
  Ok(Json(logic::generate_reorder(&state, topic).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_generate_describe_image(State(state): State<Arc<AppState>>) -> Result<Json<ImageResult>, AppError> {
  Ok(Json(logic::describe_image(&state).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_generate_mcsa(
  State(state): State<Arc<AppState>>,
  Query(q): Query<TopicQuery>,
) -> Result<Json<McsaQuestion>, AppError> {
  let topic = state.topic_or_default(q.topic.as_deref());
  Ok(Json(logic::generate_mcsa(&state, topic).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_generate_short_answer(
  State(state): State<Arc<AppState>>,
  Query(q): Query<TopicQuery>,
) -> Result<Json<ShortAnswerQuestion>, AppError> {
  let topic = state.topic_or_default(q.topic.as_deref());
  let (question, origin) = logic::generate_short_answer(&state, topic).await?;
  info!(target: "pte_backend", %origin, "Short answer question served");
  Ok(Json(question))
}

//
// Evaluation
//

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
  body
    .map(|Json(b)| b)
    .map_err(|e| AppError::invalid(format!("Invalid request body: {}", e.body_text())))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_evaluate_spoken(
  State(state): State<Arc<AppState>>,
  body: Result<Json<SpokenEvalIn>, JsonRejection>,
) -> Result<Json<EvaluationResult>, AppError> {
  let body = json_body(body)?;
  let req = EvaluationRequest {
    rubric: RubricKind::SpokenResponse,
    task_type: body.task_type,
    original_text: body.original_text,
    student_response: body.transcript,
    correct_answer: body.correct_answer.filter(|a| !a.trim().is_empty()),
  };
  Ok(Json(logic::evaluate(&state, req).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_evaluate_essay(
  State(state): State<Arc<AppState>>,
  body: Result<Json<EssayEvalIn>, JsonRejection>,
) -> Result<Json<EvaluationResult>, AppError> {
  let body = json_body(body)?;
  let req = EvaluationRequest {
    rubric: RubricKind::Essay,
    task_type: "Write Essay".into(),
    original_text: body.prompt,
    student_response: body.essay_text,
    correct_answer: None,
  };
  Ok(Json(logic::evaluate(&state, req).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_evaluate_swt(
  State(state): State<Arc<AppState>>,
  body: Result<Json<SwtEvalIn>, JsonRejection>,
) -> Result<Json<EvaluationResult>, AppError> {
  let body = json_body(body)?;
  let req = EvaluationRequest {
    rubric: RubricKind::SummarizeWrittenText,
    task_type: "Summarize Written Text".into(),
    original_text: body.original_text,
    student_response: body.summary_text,
    correct_answer: None,
  };
  Ok(Json(logic::evaluate(&state, req).await?))
}

#[instrument(level = "info", skip(state, multipart))]
pub async fn http_transcribe_and_evaluate(
  State(state): State<Arc<AppState>>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<EvaluationResult>, AppError> {
  let mut multipart = multipart.map_err(|e| AppError::invalid(format!("Invalid upload: {}", e.body_text())))?;

  let mut audio: Option<(Vec<u8>, AudioEncoding)> = None;
  let mut original_text = String::new();
  let mut task_type = String::new();
  let mut sample_rate_hz = DEFAULT_SAMPLE_RATE_HZ;
  let mut language: Option<String> = None;

  while let Some(field) = multipart.next_field().await.map_err(|e| AppError::invalid(format!("Invalid upload: {e}")))? {
    let name = field.name().unwrap_or_default().to_string();
    match name.as_str() {
      "audio" => {
        let encoding = AudioEncoding::from_mime(field.content_type().unwrap_or_default());
        let bytes = field.bytes().await.map_err(|e| AppError::invalid(format!("Invalid audio upload: {e}")))?;
        audio = Some((bytes.to_vec(), encoding));
      }
      "originalText" => original_text = field_text(field).await?,
      "taskType" => task_type = field_text(field).await?,
      "sampleRate" => {
        let raw = field_text(field).await?;
        sample_rate_hz = raw
          .trim()
          .parse::<NonZeroU32>()
          .map(NonZeroU32::get)
          .map_err(|_| AppError::invalid(format!("sampleRate must be a positive integer, got '{raw}'")))?;
      }
      "language" => language = Some(field_text(field).await?).filter(|l| !l.trim().is_empty()),
      _ => {}
    }
  }

  let Some((bytes, encoding)) = audio else {
    return Err(AppError::invalid("An audio recording is required for evaluation"));
  };
  info!(target: "pte_backend", audio_bytes = bytes.len(), encoding = encoding.as_api_str(), sample_rate_hz, "Audio upload received");

  let upload = AudioUpload { bytes, encoding, sample_rate_hz, language };
  Ok(Json(logic::transcribe_and_evaluate(&state, upload, original_text, task_type).await?))
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
  field
    .text()
    .await
    .map_err(|e| AppError::invalid(format!("Invalid form field: {e}")))
}
