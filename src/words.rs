//! Word filtering for the word bank.

use crate::domain::{DisplayWord, Language, VocabularyEntry};
use crate::util::capitalize_first;

/// Keep entries that have text in `lang` and attach their display text.
///
/// When `capitalize_for` carries the primary solution, the first entry whose
/// English text equals that solution's first word (ignoring case) is shown
/// capitalized. Other entries keep natural casing.
pub fn filter_words(
  entries: &[VocabularyEntry],
  lang: Language,
  capitalize_for: Option<&str>,
) -> Vec<DisplayWord> {
  let first_word = capitalize_for
    .and_then(|s| s.split_whitespace().next())
    .map(str::to_lowercase);
  let mut capitalized = false;

  entries
    .iter()
    .filter(|e| e.has_text(lang))
    .map(|e| {
      let text = e.text(lang);
      let display_text = match &first_word {
        Some(first) if !capitalized && e.text_en.to_lowercase() == *first => {
          capitalized = true;
          capitalize_first(text)
        }
        _ => text.to_string(),
      };
      DisplayWord { entry: e.clone(), display_text }
    })
    .collect()
}
