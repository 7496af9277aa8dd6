//! Seed data: a small built-in course so the app is useful without a data service.

use crate::domain::{Exercise, ExerciseKind, Lesson, Step, Unit, VocabularyEntry, VoiceGender};

fn word(id: &str, en: &str, he: &str, pos: &str, base: Option<&str>) -> VocabularyEntry {
  VocabularyEntry {
    id: id.into(),
    text_en: en.into(),
    text_he: he.into(),
    part_of_speech: Some(pos.into()),
    base_word_id: base.map(Into::into),
    is_name: false,
    gender: None,
    number: None,
  }
}

fn exercise(id: &str, kind: ExerciseKind, sentence: &str, solutions: &[&str], words: &[&str], voice: VoiceGender) -> Exercise {
  Exercise {
    id: id.into(),
    kind,
    sentence: sentence.into(),
    solutions: solutions.iter().map(|s| s.to_string()).collect(),
    solution_word_ids: words.iter().map(|s| s.to_string()).collect(),
    voice,
  }
}

/// Built-in vocabulary. `w-a` has no Hebrew form on purpose (Hebrew has no indefinite article).
pub fn seed_vocabulary() -> Vec<VocabularyEntry> {
  let mut words = vec![
    word("w-i", "I", "אני", "pronoun", None),
    word("w-you", "you", "אתה", "pronoun", None),
    word("w-see", "see", "רואה", "verb", None),
    word("w-saw", "saw", "ראיתי", "verb", Some("w-see")),
    word("w-want", "want", "רוצה", "verb", None),
    word("w-eat", "eat", "אוכל", "verb", None),
    word("w-cat", "cat", "חתול", "noun", None),
    word("w-cats", "cats", "חתולים", "noun", Some("w-cat")),
    word("w-dog", "dog", "כלב", "noun", None),
    word("w-dogs", "dogs", "כלבים", "noun", Some("w-dog")),
    word("w-water", "water", "מים", "noun", None),
    word("w-bread", "bread", "לחם", "noun", None),
    word("w-house", "house", "בית", "noun", None),
    word("w-book", "book", "ספר", "noun", None),
    word("w-morning", "morning", "בוקר", "noun", None),
    word("w-world", "world", "עולם", "noun", None),
    word("w-hello", "hello", "שלום", "interjection", None),
    word("w-good", "good", "טוב", "adjective", None),
    word("w-big", "big", "גדול", "adjective", None),
    word("w-a", "a", "", "article", None),
  ];
  let mut david = word("w-david", "David", "דוד", "noun", None);
  david.is_name = true;
  words.push(david);
  words
}

pub fn seed_exercises() -> Vec<Exercise> {
  use ExerciseKind::*;
  use VoiceGender::*;
  vec![
    exercise("e-hello-1", TranslateHeToEn, "שלום עולם", &["Hello world"], &["w-hello", "w-world"], Female),
    exercise("e-hello-2", TranslateEnToHe, "Hello world", &["שלום עולם"], &["w-hello", "w-world"], Male),
    exercise("e-cat-1", TranslateEnToHe, "I see a cat", &["אני רואה חתול"], &["w-i", "w-see", "w-cat"], Female),
    exercise("e-cat-2", ListenEnToTextEn, "I see a cat", &["I see a cat"], &["w-i", "w-see", "w-a", "w-cat"], Male),
    exercise("e-dog-1", ListenEnToTextHe, "I see a dog", &["אני רואה כלב"], &["w-i", "w-see", "w-dog"], Female),
    exercise("e-morning-1", TranslateHeToEn, "בוקר טוב", &["Good morning"], &["w-good", "w-morning"], Male),
    exercise("e-water-1", TranslateEnToHe, "I want water", &["אני רוצה מים"], &["w-i", "w-want", "w-water"], Female),
    exercise("e-bread-1", ListenEnToTextHe, "You eat bread", &["אתה אוכל לחם"], &["w-you", "w-eat", "w-bread"], Male),
    exercise("e-house-1", TranslateHeToEn, "בית גדול", &["A big house", "Big house"], &["w-a", "w-big", "w-house"], Female),
    exercise("e-book-1", ListenEnToTextEn, "I want a book", &["I want a book"], &["w-i", "w-want", "w-a", "w-book"], Female),
  ]
}

pub fn seed_curriculum() -> Vec<Unit> {
  let lesson = |id: &str, name: &str, ids: &[&str]| Lesson {
    id: id.into(),
    name: name.into(),
    exercise_ids: ids.iter().map(|s| s.to_string()).collect(),
  };
  vec![Unit {
    id: "unit-basics".into(),
    name: "Basics".into(),
    description: "Start your learning journey!".into(),
    steps: vec![Step {
      id: "step-first-words".into(),
      name: "First words".into(),
      lessons: vec![
        lesson("lesson-hello", "Hello World!", &["e-hello-1", "e-hello-2", "e-cat-1", "e-cat-2", "e-dog-1"]),
        lesson("lesson-daily", "Daily Fun", &["e-morning-1", "e-water-1", "e-bread-1", "e-house-1", "e-book-1"]),
      ],
    }],
  }]
}
