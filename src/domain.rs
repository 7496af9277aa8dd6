//! Domain models used by the backend: vocabulary, exercises, and the curriculum tree.

use serde::{Deserialize, Serialize};

/// Which side of the course a piece of text belongs to.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Language {
  En,
  He,
}

impl Language {
  /// BCP-47 code used by the speech endpoint.
  pub fn speech_code(self) -> &'static str {
    match self {
      Language::En => "en-US",
      Language::He => "he-IL",
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VoiceGender {
  Male,
  #[default]
  Female,
}

/// What kind of exercise is presented to the learner?
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ExerciseKind {
  /// Read an English sentence, assemble the Hebrew translation.
  TranslateEnToHe,
  /// Read (and hear) a Hebrew sentence, assemble the English translation.
  TranslateHeToEn,
  /// Hear an English sentence, assemble it back in English.
  ListenEnToTextEn,
  /// Hear an English sentence, assemble its Hebrew translation.
  ListenEnToTextHe,
}

impl ExerciseKind {
  /// Language of the prompt sentence (and of its audio).
  pub fn prompt_language(self) -> Language {
    match self {
      ExerciseKind::TranslateHeToEn => Language::He,
      ExerciseKind::TranslateEnToHe
      | ExerciseKind::ListenEnToTextEn
      | ExerciseKind::ListenEnToTextHe => Language::En,
    }
  }

  /// Language of the word bank and of the accepted solutions.
  pub fn answer_language(self) -> Language {
    match self {
      ExerciseKind::TranslateHeToEn | ExerciseKind::ListenEnToTextEn => Language::En,
      ExerciseKind::TranslateEnToHe | ExerciseKind::ListenEnToTextHe => Language::He,
    }
  }

  /// English answers start a sentence, so their first word is shown capitalized.
  pub fn capitalizes_first_word(self) -> bool {
    self.answer_language() == Language::En
  }

  /// Languages every word-bank entry must carry text for.
  pub fn required_languages(self) -> Vec<Language> {
    let mut langs = vec![self.prompt_language()];
    if self.answer_language() != self.prompt_language() {
      langs.push(self.answer_language());
    }
    langs
  }

  pub fn title(self) -> &'static str {
    match self {
      ExerciseKind::TranslateEnToHe => "Translate to Hebrew",
      ExerciseKind::TranslateHeToEn => "Translate to English",
      ExerciseKind::ListenEnToTextEn => "Listen and Select",
      ExerciseKind::ListenEnToTextHe => "Listen and Translate",
    }
  }

  /// Parse the wire name stored by the data service (`translateEnToHe`, ...).
  pub fn from_wire(s: &str) -> Option<Self> {
    match s {
      "translateEnToHe" => Some(ExerciseKind::TranslateEnToHe),
      "translateHeToEn" => Some(ExerciseKind::TranslateHeToEn),
      "listenEnToTextEn" => Some(ExerciseKind::ListenEnToTextEn),
      "listenEnToTextHe" => Some(ExerciseKind::ListenEnToTextHe),
      _ => None,
    }
  }
}

/// A single vocabulary item. Immutable once fetched.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VocabularyEntry {
  pub id: String,
  #[serde(default)] pub text_en: String,
  #[serde(default)] pub text_he: String,
  #[serde(default)] pub part_of_speech: Option<String>,
  /// Groups inflected forms of the same lemma.
  #[serde(default)] pub base_word_id: Option<String>,
  #[serde(default)] pub is_name: bool,
  #[serde(default)] pub gender: Option<String>,
  #[serde(default)] pub number: Option<String>,
}

impl VocabularyEntry {
  pub fn text(&self, lang: Language) -> &str {
    match lang {
      Language::En => &self.text_en,
      Language::He => &self.text_he,
    }
  }

  pub fn has_text(&self, lang: Language) -> bool {
    !self.text(lang).trim().is_empty()
  }

  /// Lemma key: the base word id, or the entry's own id for base words.
  pub fn lemma_id(&self) -> &str {
    self.base_word_id.as_deref().unwrap_or(&self.id)
  }
}

/// Vocabulary entry prepared for the word bank.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DisplayWord {
  pub entry: VocabularyEntry,
  pub display_text: String,
}

/// Core exercise structure. Immutable; fetched per lesson.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
  pub id: String,
  pub kind: ExerciseKind,
  pub sentence: String,
  #[serde(default)] pub solutions: Vec<String>,
  #[serde(default)] pub solution_word_ids: Vec<String>,
  #[serde(default)] pub voice: VoiceGender,
}

impl Exercise {
  pub fn primary_solution(&self) -> Option<&str> {
    self.solutions.first().map(String::as_str)
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lesson {
  pub id: String,
  #[serde(default)] pub name: String,
  #[serde(default)] pub exercise_ids: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
  pub id: String,
  #[serde(default)] pub name: String,
  #[serde(default)] pub lessons: Vec<Lesson>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Unit {
  pub id: String,
  pub name: String,
  #[serde(default)] pub description: String,
  #[serde(default)] pub steps: Vec<Step>,
}

/// Zero-based place of a lesson in the curriculum tree.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LessonPosition {
  pub unit: usize,
  pub step: usize,
  pub lesson: usize,
}

impl LessonPosition {
  /// Clients address lessons 1-based (`/lesson/1/1/1` is the first one).
  pub fn from_one_based(unit: usize, step: usize, lesson: usize) -> Option<Self> {
    Some(Self {
      unit: unit.checked_sub(1)?,
      step: step.checked_sub(1)?,
      lesson: lesson.checked_sub(1)?,
    })
  }
}

/// Look up a lesson by position.
pub fn find_lesson(units: &[Unit], pos: LessonPosition) -> Option<&Lesson> {
  units.get(pos.unit)?.steps.get(pos.step)?.lessons.get(pos.lesson)
}

/// The lesson after `pos` within the same step, if any. `None` means the
/// learner goes back to the curriculum road.
pub fn next_lesson(units: &[Unit], pos: LessonPosition) -> Option<LessonPosition> {
  let step = units.get(pos.unit)?.steps.get(pos.step)?;
  let next = pos.lesson + 1;
  (next < step.lessons.len()).then_some(LessonPosition { lesson: next, ..pos })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tree() -> Vec<Unit> {
    vec![Unit {
      id: "u1".into(),
      name: "Basics".into(),
      description: String::new(),
      steps: vec![Step {
        id: "s1".into(),
        name: "Hello".into(),
        lessons: vec![
          Lesson { id: "l1".into(), name: "One".into(), exercise_ids: vec!["e1".into()] },
          Lesson { id: "l2".into(), name: "Two".into(), exercise_ids: vec![] },
        ],
      }],
    }]
  }

  #[test]
  fn kinds_map_prompt_and_answer_languages() {
    assert_eq!(ExerciseKind::TranslateEnToHe.answer_language(), Language::He);
    assert_eq!(ExerciseKind::TranslateHeToEn.prompt_language(), Language::He);
    assert!(ExerciseKind::ListenEnToTextEn.capitalizes_first_word());
    assert!(!ExerciseKind::ListenEnToTextHe.capitalizes_first_word());
    assert_eq!(ExerciseKind::ListenEnToTextEn.required_languages(), vec![Language::En]);
    assert_eq!(
      ExerciseKind::ListenEnToTextHe.required_languages(),
      vec![Language::En, Language::He]
    );
  }

  #[test]
  fn kind_wire_names_match_serde() {
    let json = serde_json::to_string(&ExerciseKind::ListenEnToTextHe).unwrap();
    assert_eq!(json, "\"listenEnToTextHe\"");
    assert_eq!(ExerciseKind::from_wire("listenEnToTextHe"), Some(ExerciseKind::ListenEnToTextHe));
    assert_eq!(ExerciseKind::from_wire("matchPairs"), None);
  }

  #[test]
  fn lemma_falls_back_to_own_id() {
    let mut w = VocabularyEntry {
      id: "w1".into(),
      text_en: "cats".into(),
      text_he: "חתולים".into(),
      part_of_speech: None,
      base_word_id: None,
      is_name: false,
      gender: None,
      number: None,
    };
    assert_eq!(w.lemma_id(), "w1");
    w.base_word_id = Some("w0".into());
    assert_eq!(w.lemma_id(), "w0");
  }

  #[test]
  fn one_based_positions() {
    assert_eq!(
      LessonPosition::from_one_based(1, 1, 2),
      Some(LessonPosition { unit: 0, step: 0, lesson: 1 })
    );
    assert_eq!(LessonPosition::from_one_based(0, 1, 1), None);
  }

  #[test]
  fn next_lesson_stays_within_step() {
    let units = tree();
    let first = LessonPosition { unit: 0, step: 0, lesson: 0 };
    let second = next_lesson(&units, first).unwrap();
    assert_eq!(find_lesson(&units, second).map(|l| l.id.as_str()), Some("l2"));
    assert_eq!(next_lesson(&units, second), None);
  }
}
