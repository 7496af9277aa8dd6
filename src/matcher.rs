//! Answer matching for word-bank exercises.
//!
//! Exact match only: the selected words, joined by single spaces, must equal
//! one accepted solution ignoring case. No partial credit.

use crate::domain::DisplayWord;

/// Candidate answer built from the learner's selection, in selection order.
pub fn candidate_text<S: AsRef<str>>(selected: &[S]) -> String {
  selected.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ")
}

/// Compare a selection against the accepted solutions.
pub fn check_answer<S: AsRef<str>>(selected: &[S], solutions: &[String]) -> bool {
  let candidate = candidate_text(selected).to_lowercase();
  solutions.iter().any(|s| s.to_lowercase() == candidate)
}

/// Convenience over prepared words.
pub fn check_words(selected: &[DisplayWord], solutions: &[String]) -> bool {
  let texts: Vec<&str> = selected.iter().map(|w| w.display_text.as_str()).collect();
  check_answer(&texts, solutions)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sols(s: &[&str]) -> Vec<String> {
    s.iter().map(|x| x.to_string()).collect()
  }

  #[test]
  fn case_insensitive_exact_match() {
    assert!(check_answer(&["The Cat"], &sols(&["the cat"])));
    assert!(check_answer(&["The", "cat"], &sols(&["the cat"])));
  }

  #[test]
  fn no_substring_credit() {
    assert!(!check_answer(&["The Cat Sat"], &sols(&["the cat"])));
    assert!(!check_answer(&["The"], &sols(&["the cat"])));
  }

  #[test]
  fn hebrew_order_matters() {
    let solutions = sols(&["אני רואה חתול"]);
    assert!(check_answer(&["אני", "רואה", "חתול"], &solutions));
    assert!(!check_answer(&["אני", "חתול", "רואה"], &solutions));
  }

  #[test]
  fn any_accepted_solution_counts() {
    let solutions = sols(&["I see a cat", "I am seeing a cat"]);
    assert!(check_answer(&["I", "am", "seeing", "a", "cat"], &solutions));
  }

  #[test]
  fn empty_inputs_are_total() {
    let none: [&str; 0] = [];
    assert!(!check_answer(&none, &sols(&["x"])));
    assert!(!check_answer(&["x"], &[]));
    assert_eq!(candidate_text(&none), "");
  }
}
