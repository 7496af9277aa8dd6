//! Distractor selection: wrong-answer words offered next to the solution words.

use std::collections::HashSet;

use crate::domain::{ExerciseKind, VocabularyEntry};
use crate::shuffle::shuffle;

/// Ids a distractor must not carry, either as its own id or its base id.
/// Covers every solution id and every solution lemma.
pub fn excluded_ids(solutions: &[VocabularyEntry]) -> (Vec<String>, Vec<String>) {
  let ids = solutions.iter().map(|w| w.id.clone()).collect();
  let mut base_ids: Vec<String> = solutions.iter().map(|w| w.lemma_id().to_string()).collect();
  base_ids.sort_unstable();
  base_ids.dedup();
  (ids, base_ids)
}

/// True if `candidate` is a solution word or a form of one.
fn shares_identity(candidate: &VocabularyEntry, blocked: &HashSet<&str>) -> bool {
  blocked.contains(candidate.id.as_str())
    || candidate.base_word_id.as_deref().is_some_and(|b| blocked.contains(b))
}

/// Pick up to `count` distractors out of `pool`.
///
/// The pool is expected to be pre-filtered by the data service, but the
/// exclusion is applied again here. Running short of candidates only shrinks
/// the word bank.
pub fn select_distractors(
  solutions: &[VocabularyEntry],
  pool: &[VocabularyEntry],
  count: usize,
  kind: ExerciseKind,
  seed: Option<&str>,
) -> Vec<VocabularyEntry> {
  let mut blocked: HashSet<&str> = HashSet::new();
  for s in solutions {
    blocked.insert(s.id.as_str());
    blocked.insert(s.lemma_id());
  }
  let required = kind.required_languages();

  let candidates: Vec<VocabularyEntry> = pool
    .iter()
    .filter(|w| !shares_identity(w, &blocked))
    .filter(|w| required.iter().all(|lang| w.has_text(*lang)))
    .cloned()
    .collect();

  let mut picked = shuffle(&candidates, seed);
  picked.truncate(count);
  picked
}
