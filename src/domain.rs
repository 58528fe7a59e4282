//! Domain models: task kinds, generated exercise content and evaluation rubrics.
//!
//! Everything here is request-scoped; nothing is stored between requests.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// PTE exercise categories that have a generation template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
  ReadAloud,
  RepeatSentence,
  ReorderParagraph,
  Essay,
  SummarizeWrittenText,
  MultipleChoiceSingleAnswer,
  AnswerShortQuestion,
}

impl TaskKind {
  pub const ALL: [TaskKind; 7] = [
    TaskKind::ReadAloud,
    TaskKind::RepeatSentence,
    TaskKind::ReorderParagraph,
    TaskKind::Essay,
    TaskKind::SummarizeWrittenText,
    TaskKind::MultipleChoiceSingleAnswer,
    TaskKind::AnswerShortQuestion,
  ];

  /// URL slug, as used under `/api/generate/`.
  pub fn slug(self) -> &'static str {
    match self {
      TaskKind::ReadAloud => "read-aloud",
      TaskKind::RepeatSentence => "repeat-sentence",
      TaskKind::ReorderParagraph => "reorder-paragraph",
      TaskKind::Essay => "essay",
      TaskKind::SummarizeWrittenText => "summarize-written-text",
      TaskKind::MultipleChoiceSingleAnswer => "mcsa",
      TaskKind::AnswerShortQuestion => "answer-short-question",
    }
  }

  /// Accepts both `read-aloud` and `read_aloud` spellings.
  pub fn from_slug(s: &str) -> Option<Self> {
    let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
    TaskKind::ALL.into_iter().find(|k| k.slug() == wanted)
  }

  /// Kinds whose payload is the model's text as-is.
  pub fn is_plain_text(self) -> bool {
    matches!(
      self,
      TaskKind::ReadAloud | TaskKind::RepeatSentence | TaskKind::Essay | TaskKind::SummarizeWrittenText
    )
  }
}

/// Which rubric an evaluation produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RubricKind {
  SpokenResponse,
  Essay,
  SummarizeWrittenText,
}

impl RubricKind {
  /// Keys the model must return. `transcript` is absent from the spoken list
  /// because it is always injected from the request.
  pub fn required_keys(self) -> &'static [&'static str] {
    match self {
      RubricKind::SpokenResponse => &[
        "oral_fluency",
        "pronunciation",
        "content",
        "overall_score_out_of_90",
        "final_summary",
      ],
      RubricKind::Essay => &[
        "content",
        "form",
        "grammar",
        "vocabulary",
        "structure",
        "overall_score_out_of_90",
        "final_summary",
      ],
      RubricKind::SummarizeWrittenText => &[
        "content",
        "form",
        "grammar",
        "vocabulary",
        "word_count",
        "overall_score_out_of_7",
        "final_summary",
      ],
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      RubricKind::SpokenResponse => "spoken_response",
      RubricKind::Essay => "essay",
      RubricKind::SummarizeWrittenText => "summarize_written_text",
    }
  }
}

/// Shuffled sentences plus the ground-truth order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReorderExercise {
  #[serde(rename = "sentences")]
  pub shuffled: Vec<String>,
  pub solution: Vec<String>,
}

/// Multiple-choice, single-answer reading question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct McsaQuestion {
  pub passage: String,
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer_index: u8,
}

impl McsaQuestion {
  pub const OPTION_COUNT: usize = 4;

  pub fn is_well_formed(&self) -> bool {
    self.options.len() == Self::OPTION_COUNT
      && usize::from(self.correct_answer_index) < Self::OPTION_COUNT
      && !self.passage.trim().is_empty()
      && !self.question.trim().is_empty()
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortAnswerQuestion {
  pub question: String,
  pub answer: String,
}

/// Search hit from the image provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageResult {
  #[serde(rename = "imageUrl")]
  pub image_url: String,
  #[serde(rename = "alt")]
  pub alt_text: String,
  #[serde(rename = "photographer")]
  pub attribution: String,
}

/// A student submission awaiting evaluation.
#[derive(Clone, Debug)]
pub struct EvaluationRequest {
  pub rubric: RubricKind,
  pub task_type: String,
  pub original_text: String,
  /// Transcript, essay or summary text.
  pub student_response: String,
  pub correct_answer: Option<String>,
}

/// Rubric object returned by the model, validated against `RubricKind::required_keys`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EvaluationResult(pub Map<String, Value>);

impl EvaluationResult {
  /// Replace whatever the model echoed with the verbatim transcript.
  pub fn set_transcript(&mut self, transcript: &str) {
    self.0.insert("transcript".into(), Value::String(transcript.to_string()));
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn slugs_round_trip_and_accept_snake_case() {
    for kind in TaskKind::ALL {
      assert_eq!(TaskKind::from_slug(kind.slug()), Some(kind));
    }
    assert_eq!(TaskKind::from_slug("read_aloud"), Some(TaskKind::ReadAloud));
    assert_eq!(TaskKind::from_slug("MCSA"), Some(TaskKind::MultipleChoiceSingleAnswer));
    assert_eq!(TaskKind::from_slug("describe-image"), None);
    assert!(TaskKind::Essay.is_plain_text());
    assert!(!TaskKind::MultipleChoiceSingleAnswer.is_plain_text());
  }

  #[test]
  fn mcsa_well_formedness() {
    let mut q = McsaQuestion {
      passage: "p".into(),
      question: "q".into(),
      options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
      correct_answer_index: 3,
    };
    assert!(q.is_well_formed());
    q.correct_answer_index = 4;
    assert!(!q.is_well_formed());
    q.correct_answer_index = 0;
    q.options.pop();
    assert!(!q.is_well_formed());
  }

  #[test]
  fn set_transcript_overwrites_model_echo() {
    let mut r = EvaluationResult(Map::new());
    r.0.insert("transcript".into(), Value::String("hallucinated".into()));
    r.set_transcript("what I said");
    assert_eq!(r.get("transcript"), Some(&Value::String("what I said".into())));
  }

  #[test]
  fn image_result_uses_client_field_names() {
    let img = ImageResult { image_url: "u".into(), alt_text: "a".into(), attribution: "p".into() };
    let v = serde_json::to_value(img).unwrap();
    assert_eq!(v, serde_json::json!({ "imageUrl": "u", "alt": "a", "photographer": "p" }));
  }
}
