//! Exercise ordering within a lesson.

use crate::shuffle::shuffle;

/// Presentation order for a lesson's exercises.
///
/// Seeded with the lesson id the order is stable, so resuming a lesson shows
/// the same sequence. Without a seed every call draws a fresh order.
pub fn sequence_exercises(ids: &[String], seed: Option<&str>) -> Vec<String> {
  shuffle(ids, seed)
}

/// Order used on retry. Never seeded, so a retry differs from the first attempt.
pub fn reshuffle<T: Clone>(items: &[T]) -> Vec<T> {
  shuffle(items, None)
}
