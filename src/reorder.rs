//! Re-order Paragraph exercise: shuffle the model's sentences so the exercise
//! never starts out solved.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::ReorderExercise;

/// Shuffle `solution` with the thread-local RNG.
pub fn reorder(solution: Vec<String>) -> ReorderExercise {
  reorder_with(solution, &mut rand::thread_rng())
}

/// Uniform shuffle, redrawn until it differs from `solution`.
///
/// When every arrangement is identical (zero or one sentence, or all sentences
/// equal) the solution order is returned as-is.
pub fn reorder_with<R: Rng + ?Sized>(solution: Vec<String>, rng: &mut R) -> ReorderExercise {
  let mut shuffled = solution.clone();
  if has_alternative_arrangement(&solution) {
    loop {
      shuffled.shuffle(rng);
      if shuffled != solution {
        break;
      }
    }
  }
  ReorderExercise { shuffled, solution }
}

fn has_alternative_arrangement(items: &[String]) -> bool {
  match items.first() {
    Some(first) => items.iter().any(|s| s != first),
    None => false,
  }
}
