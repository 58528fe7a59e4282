//! Built-in Answer Short Question items, served when the model is unreachable
//! or replies with something unusable.

use rand::Rng;

use crate::domain::ShortAnswerQuestion;

const FALLBACK_SHORT_ANSWERS: &[(&str, &str)] = &[
  ("What is the name of the instrument used to measure temperature?", "A thermometer"),
  ("How many sides does a hexagon have?", "Six"),
  ("What do we call a person who designs buildings?", "An architect"),
  ("Which organ pumps blood around the human body?", "The heart"),
  ("What is frozen water called?", "Ice"),
  ("What is the opposite of 'ancient'?", "Modern"),
  ("Which planet is known as the Red Planet?", "Mars"),
  ("What do you call a book of maps?", "An atlas"),
];

/// Minimal set of built-in questions that keep the task usable without the model.
pub fn fallback_short_answers() -> Vec<ShortAnswerQuestion> {
  FALLBACK_SHORT_ANSWERS
    .iter()
    .map(|(q, a)| ShortAnswerQuestion { question: (*q).into(), answer: (*a).into() })
    .collect()
}

/// One fallback item, picked at random.
pub fn random_short_answer() -> ShortAnswerQuestion {
  let mut all = fallback_short_answers();
  let idx = rand::thread_rng().gen_range(0..all.len());
  all.swap_remove(idx)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn random_pick_comes_from_the_set() {
    let all = fallback_short_answers();
    assert!(all.len() >= 5);
    for _ in 0..20 {
      assert!(all.contains(&random_short_answer()));
    }
  }

  #[test]
  fn fallback_items_are_complete() {
    for q in fallback_short_answers() {
      assert!(!q.question.trim().is_empty());
      assert!(!q.answer.trim().is_empty());
    }
  }
}
