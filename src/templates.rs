//! Prompt template registry: (task kind, topic) → instruction string.

use crate::config::Prompts;
use crate::domain::{EvaluationRequest, RubricKind, TaskKind};
use crate::util::{fill_template, word_count};

impl Prompts {
  fn template_for(&self, kind: TaskKind) -> &str {
    match kind {
      TaskKind::ReadAloud => &self.read_aloud,
      TaskKind::RepeatSentence => &self.repeat_sentence,
      TaskKind::ReorderParagraph => &self.reorder_paragraph,
      TaskKind::Essay => &self.essay,
      TaskKind::SummarizeWrittenText => &self.summarize_written_text,
      TaskKind::MultipleChoiceSingleAnswer => &self.mcsa,
      TaskKind::AnswerShortQuestion => &self.answer_short_question,
    }
  }

  /// Generation instruction for `kind` about `topic`.
  pub fn render(&self, kind: TaskKind, topic: &str) -> String {
    fill_template(self.template_for(kind), &[("topic", topic)])
  }

  /// Like [`Prompts::render`], keyed by task slug; unknown names get the fallback template.
  pub fn render_named(&self, task: &str, topic: &str) -> String {
    match TaskKind::from_slug(task) {
      Some(kind) => self.render(kind, topic),
      None => fill_template(&self.fallback, &[("topic", topic)]),
    }
  }

  /// Evaluation instruction for a student submission.
  pub fn render_evaluation(&self, req: &EvaluationRequest) -> String {
    let template = match req.rubric {
      RubricKind::SpokenResponse => &self.evaluate_spoken_response,
      RubricKind::Essay => &self.evaluate_essay,
      RubricKind::SummarizeWrittenText => &self.evaluate_swt,
    };
    let words = word_count(&req.student_response).to_string();
    let correct_answer = req.correct_answer.as_deref().unwrap_or("N/A");
    // Single pass: placeholders typed into any request field stay literal.
    fill_template(
      template,
      &[
        ("task_type", req.task_type.as_str()),
        ("original_text", req.original_text.as_str()),
        ("correct_answer", correct_answer),
        ("word_count", words.as_str()),
        ("student_response", req.student_response.as_str()),
      ],
    )
  }
}
