//! Loading app configuration (lesson settings + optional local content bank) from TOML.
//!
//! See `AppConfig` and `LessonSettings` for expected schema.

use serde::Deserialize;
use tracing::{info, error};

use crate::domain::{ExerciseKind, Unit, VocabularyEntry, VoiceGender};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub lesson: LessonSettings,
  #[serde(default)]
  pub vocabulary: Vec<VocabularyEntry>,
  #[serde(default)]
  pub exercises: Vec<ExerciseCfg>,
  #[serde(default)]
  pub units: Vec<Unit>,
}

/// Exercise entry accepted in TOML configuration. A missing id gets a fresh uuid.
#[derive(Clone, Debug, Deserialize)]
pub struct ExerciseCfg {
  #[serde(default)] pub id: Option<String>,
  pub kind: ExerciseKind,
  pub sentence: String,
  #[serde(default)] pub solutions: Vec<String>,
  #[serde(default)] pub solution_word_ids: Vec<String>,
  #[serde(default)] pub voice: VoiceGender,
}

/// Knobs for lesson scoring and word-bank preparation.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LessonSettings {
  /// Inclusive passing percentage.
  pub pass_threshold: u32,
  /// Distractor pool requested from the data service, as a multiple of the count needed.
  pub distractor_pool_factor: usize,
  /// Seed word banks from the solution ids so a prepared exercise is stable.
  pub deterministic_word_bank: bool,
}

impl Default for LessonSettings {
  fn default() -> Self {
    Self { pass_threshold: 60, distractor_pool_factor: 5, deterministic_word_bank: true }
  }
}

pub fn parse_app_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}

/// Attempt to load `AppConfig` from APP_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("APP_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(
          target: "milim_backend", %path,
          words = cfg.vocabulary.len(), exercises = cfg.exercises.len(), units = cfg.units.len(),
          "Loaded app config (TOML)"
        );
        Some(cfg)
      }
      Err(e) => {
        error!(target: "milim_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "milim_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = parse_app_config("").unwrap();
    assert_eq!(cfg.lesson.pass_threshold, 60);
    assert_eq!(cfg.lesson.distractor_pool_factor, 5);
    assert!(cfg.lesson.deterministic_word_bank);
    assert!(cfg.exercises.is_empty());
  }

  #[test]
  fn parses_bank_and_curriculum() {
    let src = r#"
      [lesson]
      pass_threshold = 70

      [[vocabulary]]
      id = "w-dog"
      text_en = "dog"
      text_he = "כלב"

      [[exercises]]
      kind = "translateHeToEn"
      sentence = "כלב"
      solutions = ["Dog"]
      solution_word_ids = ["w-dog"]
      voice = "male"

      [[units]]
      id = "u1"
      name = "Animals"

      [[units.steps]]
      id = "s1"

      [[units.steps.lessons]]
      id = "l1"
      exercise_ids = ["e1"]
    "#;
    let cfg = parse_app_config(src).unwrap();
    assert_eq!(cfg.lesson.pass_threshold, 70);
    assert!(cfg.lesson.deterministic_word_bank);
    assert_eq!(cfg.vocabulary[0].text_he, "כלב");
    assert_eq!(cfg.exercises[0].kind, ExerciseKind::TranslateHeToEn);
    assert_eq!(cfg.exercises[0].voice, VoiceGender::Male);
    assert!(cfg.exercises[0].id.is_none());
    assert_eq!(cfg.units[0].steps[0].lessons[0].exercise_ids, vec!["e1".to_string()]);
  }

  #[test]
  fn unknown_kind_is_rejected() {
    let src = r#"
      [[exercises]]
      kind = "matchPairs"
      sentence = "x"
    "#;
    assert!(parse_app_config(src).is_err());
  }
}
