//! Request pipelines behind the HTTP handlers.
//!
//! Each one: validate input → render template → one upstream call → normalize →
//! shape the payload. Transcribe-and-evaluate is the only pipeline with two calls,
//! made strictly one after the other.

use rand::seq::SliceRandom;
use tracing::{info, instrument, warn};

use crate::domain::{
  EvaluationRequest, EvaluationResult, ImageResult, McsaQuestion, ReorderExercise, RubricKind, ShortAnswerQuestion,
  TaskKind,
};
use crate::error::AppError;
use crate::normalize::{normalize_into, normalize_object, normalize_sentences, normalize_text, FormatError};
use crate::providers::{AudioEncoding, TextGenerator};
use crate::reorder::reorder;
use crate::seeds::random_short_answer;
use crate::state::AppState;

pub const MCSA_ERROR: &str = "Failed to generate a valid MCSA question. Please try again.";
pub const REORDER_ERROR: &str = "Failed to generate a paragraph for reordering. Please try again.";
pub const EVALUATION_ERROR: &str = "Failed to evaluate the response. Please try again.";

const MCSA_KEYS: &[&str] = &["passage", "question", "options", "correct_answer_index"];
const SHORT_ANSWER_KEYS: &[&str] = &["question", "answer"];

/// Read Aloud, Repeat Sentence, Essay prompt and Summarize Written Text, by slug.
/// A slug without a template gets the generic fallback instruction.
#[instrument(level = "info", skip(state))]
pub async fn generate_plain_text(state: &AppState, task: &str, topic: &str) -> Result<String, AppError> {
  let generator = state.text_generator()?;
  let prompt = state.prompts().render_named(task, topic);
  let raw = generator.generate_text(&prompt).await?;
  let text = normalize_text(&raw);
  info!(target: "pte_backend", %task, text_len = text.len(), "Generated plain-text task");
  Ok(text)
}

#[instrument(level = "info", skip(state))]
pub async fn generate_reorder(state: &AppState, topic: &str) -> Result<ReorderExercise, AppError> {
  let generator = state.text_generator()?;
  let prompt = state.prompts().render(TaskKind::ReorderParagraph, topic);
  let raw = generator.generate_text(&prompt).await?;
  let sentences = normalize_sentences(&raw);
  if sentences.len() < 2 {
    let cause = FormatError::Unusable(format!("expected several sentences, got {}", sentences.len()));
    warn!(target: "upstream", error = %cause, "Reorder paragraph rejected");
    return Err(AppError::format(REORDER_ERROR, cause));
  }
  let exercise = reorder(sentences);
  info!(target: "pte_backend", sentences = exercise.solution.len(), "Generated reorder exercise");
  Ok(exercise)
}

#[instrument(level = "info", skip(state))]
pub async fn generate_mcsa(state: &AppState, topic: &str) -> Result<McsaQuestion, AppError> {
  let generator = state.text_generator()?;
  let prompt = state.prompts().render(TaskKind::MultipleChoiceSingleAnswer, topic);
  let raw = generator.generate_text(&prompt).await?;
  let question: McsaQuestion = normalize_into(&raw, MCSA_KEYS).map_err(|e| AppError::format(MCSA_ERROR, e))?;
  if !question.is_well_formed() {
    let cause = FormatError::Unusable(format!(
      "{} options, correct_answer_index {}",
      question.options.len(),
      question.correct_answer_index
    ));
    warn!(target: "upstream", error = %cause, "MCSA question rejected");
    return Err(AppError::format(MCSA_ERROR, cause));
  }
  Ok(question)
}

/// Never fails once the model is configured: unreachable or unusable replies are
/// replaced by a built-in question. Also returns where the question came from.
#[instrument(level = "info", skip(state))]
pub async fn generate_short_answer(
  state: &AppState,
  topic: &str,
) -> Result<(ShortAnswerQuestion, &'static str), AppError> {
  let generator = state.text_generator()?;
  let prompt = state.prompts().render(TaskKind::AnswerShortQuestion, topic);
  let parsed = match generator.generate_text(&prompt).await {
    Ok(raw) => normalize_into::<ShortAnswerQuestion>(&raw, SHORT_ANSWER_KEYS).map_err(AppError::from),
    Err(e) => Err(AppError::from(e)),
  };
  match parsed {
    Ok(q) if !q.question.trim().is_empty() && !q.answer.trim().is_empty() => Ok((q, "generated")),
    Ok(_) => {
      warn!(target: "pte_backend", "Short answer question had blank fields; serving fallback");
      Ok((random_short_answer(), "fallback"))
    }
    Err(e) => {
      warn!(target: "pte_backend", error = %e, "Short answer generation failed; serving fallback");
      Ok((random_short_answer(), "fallback"))
    }
  }
}

#[instrument(level = "info", skip(state))]
pub async fn describe_image(state: &AppState) -> Result<ImageResult, AppError> {
  let search = state.image_search()?;
  let terms: Vec<&str> = state
    .config
    .image_search_terms
    .iter()
    .map(|t| t.trim())
    .filter(|t| !t.is_empty())
    .collect();
  let query = terms.choose(&mut rand::thread_rng()).copied().unwrap_or("lecture");
  let image = search.search_image(query).await?;
  info!(target: "pte_backend", %query, photographer = %image.attribution, "Image selected");
  Ok(image)
}

/// Evaluate a typed submission (spoken transcript, essay or summary).
#[instrument(level = "info", skip(state, req), fields(rubric = req.rubric.label(), response_len = req.student_response.len()))]
pub async fn evaluate(state: &AppState, req: EvaluationRequest) -> Result<EvaluationResult, AppError> {
  require_text(&req.student_response, primary_field(req.rubric))?;
  let generator = state.text_generator()?;
  run_evaluation(state, generator, &req).await
}

/// An uploaded recording and how to decode it.
#[derive(Clone, Debug)]
pub struct AudioUpload {
  pub bytes: Vec<u8>,
  pub encoding: AudioEncoding,
  pub sample_rate_hz: u32,
  pub language: Option<String>,
}

/// Transcribe, then evaluate the transcript as a spoken response.
#[instrument(level = "info", skip(state, audio, original_text), fields(audio_bytes = audio.bytes.len()))]
pub async fn transcribe_and_evaluate(
  state: &AppState,
  audio: AudioUpload,
  original_text: String,
  task_type: String,
) -> Result<EvaluationResult, AppError> {
  if audio.bytes.is_empty() {
    return Err(AppError::invalid("An audio recording is required for evaluation"));
  }
  let speech = state.transcriber()?;
  let generator = state.text_generator()?;

  let language = audio.language.as_deref().unwrap_or(&state.config.speech_language);
  let transcript = speech
    .transcribe(&audio.bytes, audio.encoding, audio.sample_rate_hz, language)
    .await?;
  let transcript = transcript.trim().to_string();
  if transcript.is_empty() {
    return Err(AppError::NoSpeechDetected);
  }
  info!(target: "pte_backend", transcript_len = transcript.len(), "Transcription complete; evaluating");

  let req = EvaluationRequest {
    rubric: RubricKind::SpokenResponse,
    task_type,
    original_text,
    student_response: transcript,
    correct_answer: None,
  };
  run_evaluation(state, generator, &req).await
}

async fn run_evaluation(
  state: &AppState,
  generator: &dyn TextGenerator,
  req: &EvaluationRequest,
) -> Result<EvaluationResult, AppError> {
  let prompt = state.prompts().render_evaluation(req);
  let raw = generator.generate_text(&prompt).await?;
  let obj = normalize_object(&raw, req.rubric.required_keys()).map_err(|e| AppError::format(EVALUATION_ERROR, e))?;
  let mut result = EvaluationResult(obj);
  if req.rubric == RubricKind::SpokenResponse {
    result.set_transcript(&req.student_response);
  }
  let overall = result.get("overall_score_out_of_90").or_else(|| result.get("overall_score_out_of_7"));
  info!(target: "pte_backend", rubric = req.rubric.label(), overall = ?overall, "Evaluation complete");
  Ok(result)
}

fn primary_field(rubric: RubricKind) -> &'static str {
  match rubric {
    RubricKind::SpokenResponse => "Transcript",
    RubricKind::Essay => "Essay text",
    RubricKind::SummarizeWrittenText => "Summary text",
  }
}

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
  if value.trim().is_empty() {
    Err(AppError::invalid(format!("{field} is required for evaluation")))
  } else {
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use serde_json::json;

  use super::*;
  use crate::config::AppConfig;
  use crate::providers::fakes::{FakeImages, FakeSpeech, FakeText};
  use crate::providers::{ImageSearch, Transcriber};
  use crate::state::Providers;

  fn state_with(text: Option<Arc<FakeText>>, speech: Option<Arc<FakeSpeech>>) -> AppState {
    AppState::new(
      AppConfig::default(),
      Providers {
        text: text.map(|t| t as Arc<dyn TextGenerator>),
        images: None,
        speech: speech.map(|s| s as Arc<dyn Transcriber>),
      },
    )
  }

  fn spoken_rubric_json(echoed_transcript: &str) -> String {
    json!({
      "oral_fluency": { "score": 4, "feedback": "Smooth." },
      "pronunciation": { "score": 3, "feedback": "Clear." },
      "content": { "score": 5, "feedback": "Complete." },
      "overall_score_out_of_90": 72,
      "final_summary": "Good reading.",
      "transcript": echoed_transcript
    })
    .to_string()
  }

  fn upload() -> AudioUpload {
    AudioUpload { bytes: vec![1, 2, 3], encoding: AudioEncoding::WebmOpus, sample_rate_hz: 48_000, language: None }
  }

  #[tokio::test]
  async fn reorder_scenario_shuffles_four_sentences() {
    let fake = Arc::new(FakeText::replying("Sentence A.\nSentence B.\nSentence C.\nSentence D."));
    let state = state_with(Some(fake.clone()), None);

    let ex = generate_reorder(&state, "climate change").await.unwrap();

    assert_eq!(ex.solution, vec!["Sentence A.", "Sentence B.", "Sentence C.", "Sentence D."]);
    assert_ne!(ex.shuffled, ex.solution);
    let mut sorted = ex.shuffled.clone();
    sorted.sort();
    assert_eq!(sorted, ex.solution);
    assert!(fake.last_prompt().unwrap().contains("climate change"));
  }

  #[tokio::test]
  async fn reorder_with_single_line_is_a_format_error() {
    let fake = Arc::new(FakeText::replying("One long paragraph with no line breaks at all."));
    let state = state_with(Some(fake), None);
    match generate_reorder(&state, "t").await {
      Err(AppError::UpstreamFormat { message, .. }) => assert_eq!(message, REORDER_ERROR),
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[tokio::test]
  async fn plain_text_strips_fences() {
    let fake = Arc::new(FakeText::replying("```\nThe ocean absorbs heat.\n```"));
    let state = state_with(Some(fake), None);
    let text = generate_plain_text(&state, "repeat-sentence", "oceans").await.unwrap();
    assert_eq!(text, "The ocean absorbs heat.");
  }

  #[tokio::test]
  async fn mcsa_valid_object_is_returned_unchanged() {
    let body = json!({
      "passage": "Bees pollinate crops.",
      "question": "What do bees do?",
      "options": ["Pollinate", "Sleep", "Swim", "Sing"],
      "correct_answer_index": 0
    });
    let fake = Arc::new(FakeText::replying(format!("```json\n{body}\n```")));
    let state = state_with(Some(fake), None);
    let q = generate_mcsa(&state, "bees").await.unwrap();
    assert_eq!(serde_json::to_value(&q).unwrap(), body);
  }

  #[tokio::test]
  async fn mcsa_missing_index_fails_with_mcsa_message() {
    let body = json!({
      "passage": "p", "question": "q", "options": ["a", "b", "c", "d"]
    });
    let fake = Arc::new(FakeText::replying(body.to_string()));
    let state = state_with(Some(fake), None);
    let err = generate_mcsa(&state, "t").await.unwrap_err();
    assert_eq!(err.client_message(), MCSA_ERROR);
    assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[tokio::test]
  async fn mcsa_with_three_options_is_rejected() {
    let body = json!({
      "passage": "p", "question": "q", "options": ["a", "b", "c"], "correct_answer_index": 1
    });
    let state = state_with(Some(Arc::new(FakeText::replying(body.to_string()))), None);
    assert_eq!(generate_mcsa(&state, "t").await.unwrap_err().client_message(), MCSA_ERROR);
  }

  #[tokio::test]
  async fn short_answer_falls_back_on_garbage_and_outage() {
    let garbage = state_with(Some(Arc::new(FakeText::replying("{\"question\": \"Only half\"}"))), None);
    let (_, source) = generate_short_answer(&garbage, "t").await.unwrap();
    assert_eq!(source, "fallback");

    let down = state_with(Some(Arc::new(FakeText::unavailable())), None);
    let (q, source) = generate_short_answer(&down, "t").await.unwrap();
    assert_eq!(source, "fallback");
    assert!(crate::seeds::fallback_short_answers().contains(&q));

    let good = state_with(
      Some(Arc::new(FakeText::replying(r#"{"question": "What melts ice?", "answer": "Heat"}"#))),
      None,
    );
    let (q, source) = generate_short_answer(&good, "t").await.unwrap();
    assert_eq!(source, "generated");
    assert_eq!(q.answer, "Heat");
  }

  #[tokio::test]
  async fn short_answer_without_model_is_still_a_configuration_error() {
    let state = state_with(None, None);
    assert!(matches!(generate_short_answer(&state, "t").await, Err(AppError::Configuration { .. })));
  }

  #[tokio::test]
  async fn empty_submission_never_reaches_upstream() {
    let fake = Arc::new(FakeText::replying(spoken_rubric_json("x")));
    let state = state_with(Some(fake.clone()), None);
    for rubric in [RubricKind::SpokenResponse, RubricKind::Essay, RubricKind::SummarizeWrittenText] {
      let req = EvaluationRequest {
        rubric,
        task_type: "Read Aloud".into(),
        original_text: "Original.".into(),
        student_response: "   ".into(),
        correct_answer: None,
      };
      assert!(matches!(evaluate(&state, req).await, Err(AppError::InvalidInput(_))));
    }
    assert_eq!(fake.calls(), 0);
  }

  #[tokio::test]
  async fn spoken_transcript_is_always_the_input() {
    let fake = Arc::new(FakeText::replying(spoken_rubric_json("something the model misheard")));
    let state = state_with(Some(fake), None);
    let req = EvaluationRequest {
      rubric: RubricKind::SpokenResponse,
      task_type: "Read Aloud".into(),
      original_text: "The climate is changing.".into(),
      student_response: "the climate is changing".into(),
      correct_answer: None,
    };
    let result = evaluate(&state, req).await.unwrap();
    assert_eq!(result.get("transcript"), Some(&json!("the climate is changing")));
    assert_eq!(result.get("overall_score_out_of_90"), Some(&json!(72)));
  }

  #[tokio::test]
  async fn essay_rubric_missing_structure_is_rejected() {
    let body = json!({
      "content": {}, "form": {}, "grammar": {}, "vocabulary": {},
      "overall_score_out_of_90": 60, "final_summary": "ok"
    });
    let state = state_with(Some(Arc::new(FakeText::replying(body.to_string()))), None);
    let req = EvaluationRequest {
      rubric: RubricKind::Essay,
      task_type: "Essay".into(),
      original_text: "Discuss.".into(),
      student_response: "Some essay text.".into(),
      correct_answer: None,
    };
    assert_eq!(evaluate(&state, req).await.unwrap_err().client_message(), EVALUATION_ERROR);
  }

  #[tokio::test]
  async fn silent_recording_skips_evaluation() {
    let text = Arc::new(FakeText::replying(spoken_rubric_json("x")));
    let speech = Arc::new(FakeSpeech::hearing("   "));
    let state = state_with(Some(text.clone()), Some(speech.clone()));

    let err = transcribe_and_evaluate(&state, upload(), "Original.".into(), "Read Aloud".into())
      .await
      .unwrap_err();

    assert!(matches!(err, AppError::NoSpeechDetected));
    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    assert!(err.client_message().contains("Could not detect speech"));
    assert_eq!(speech.calls(), 1);
    assert_eq!(text.calls(), 0);
  }

  #[tokio::test]
  async fn transcription_feeds_evaluation() {
    let text = Arc::new(FakeText::replying(spoken_rubric_json("garbled")));
    let speech = Arc::new(FakeSpeech::hearing(" urban farming is growing "));
    let state = state_with(Some(text.clone()), Some(speech.clone()));

    let result = transcribe_and_evaluate(&state, upload(), "Urban farming...".into(), "Read Aloud".into())
      .await
      .unwrap();

    assert_eq!(result.get("transcript"), Some(&json!("urban farming is growing")));
    assert_eq!(text.calls(), 1);
    assert!(text.last_prompt().unwrap().contains("urban farming is growing"));
    assert_eq!(speech.last_request(), Some((AudioEncoding::WebmOpus, 48_000, "en-US".to_string())));
  }

  #[tokio::test]
  async fn missing_evaluator_is_reported_before_transcribing() {
    let speech = Arc::new(FakeSpeech::hearing("hello"));
    let state = state_with(None, Some(speech.clone()));
    let err = transcribe_and_evaluate(&state, upload(), String::new(), String::new()).await.unwrap_err();
    assert!(matches!(err, AppError::Configuration { .. }));
    assert_eq!(speech.calls(), 0);
  }

  #[tokio::test]
  async fn describe_image_reports_no_results() {
    let images = Arc::new(FakeImages::with(None));
    let mut state = state_with(None, None);
    state.providers.images = Some(images.clone() as Arc<dyn ImageSearch>);
    let err = describe_image(&state).await.unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    assert_eq!(images.calls(), 1);
  }
}
