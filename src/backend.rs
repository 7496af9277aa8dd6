//! Data service access: exercises, vocabulary, distractor pools, and the curriculum.
//!
//! Two sources behind one enum:
//!   - `LocalStore`: in-memory bank (TOML config entries + built-in seeds)
//!   - `RestBackend`: PostgREST-style HTTP API (SUPABASE_URL / SUPABASE_ANON_KEY)
//!
//! Calls are instrumented and log counts and latencies, never row contents.

use std::{collections::{HashMap, HashSet}, sync::Arc, time::Duration};

use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::{Exercise, ExerciseKind, Lesson, Step, Unit, VocabularyEntry, VoiceGender};
use crate::error::DataError;
use crate::seeds::{seed_curriculum, seed_exercises, seed_vocabulary};
use crate::util::trunc_for_log;

#[derive(Clone)]
pub enum DataSource {
  Local(LocalStore),
  Rest(RestBackend),
}

impl DataSource {
  pub fn kind(&self) -> &'static str {
    match self {
      DataSource::Local(_) => "local",
      DataSource::Rest(_) => "rest",
    }
  }

  /// Exercises for `ids`, in whatever order the source stores them. Unknown ids are skipped.
  #[instrument(level = "debug", skip(self, ids), fields(source = self.kind(), n = ids.len()))]
  pub async fn fetch_exercises_by_ids(&self, ids: &[String]) -> Result<Vec<Exercise>, DataError> {
    match self {
      DataSource::Local(s) => Ok(s.exercises_by_ids(ids)),
      DataSource::Rest(r) => r.fetch_exercises_by_ids(ids).await,
    }
  }

  #[instrument(level = "debug", skip(self, ids), fields(source = self.kind(), n = ids.len()))]
  pub async fn fetch_words_by_ids(&self, ids: &[String]) -> Result<Vec<VocabularyEntry>, DataError> {
    match self {
      DataSource::Local(s) => Ok(s.words_by_ids(ids)),
      DataSource::Rest(r) => r.fetch_words_by_ids(ids).await,
    }
  }

  /// Candidate distractors: up to `limit` words outside `exclude_ids` whose base
  /// word is not in `exclude_base_ids`, ordered by id.
  #[instrument(level = "debug", skip(self, exclude_ids, exclude_base_ids), fields(source = self.kind(), %limit))]
  pub async fn fetch_distractor_pool(
    &self,
    exclude_ids: &[String],
    exclude_base_ids: &[String],
    limit: usize,
  ) -> Result<Vec<VocabularyEntry>, DataError> {
    match self {
      DataSource::Local(s) => Ok(s.distractor_pool(exclude_ids, exclude_base_ids, limit)),
      DataSource::Rest(r) => r.fetch_distractor_pool(exclude_ids, exclude_base_ids, limit).await,
    }
  }

  #[instrument(level = "debug", skip(self), fields(source = self.kind()))]
  pub async fn fetch_curriculum(&self) -> Result<Vec<Unit>, DataError> {
    match self {
      DataSource::Local(s) => Ok(s.units().to_vec()),
      DataSource::Rest(r) => r.fetch_curriculum().await,
    }
  }
}

// -------- Local in-memory store --------

struct LocalData {
  words: Vec<VocabularyEntry>,
  exercises: Vec<Exercise>,
  units: Vec<Unit>,
}

#[derive(Clone)]
pub struct LocalStore {
  inner: Arc<LocalData>,
}

impl LocalStore {
  pub fn new(words: Vec<VocabularyEntry>, exercises: Vec<Exercise>, units: Vec<Unit>) -> Self {
    let mut words = words;
    words.sort_by(|a, b| a.id.cmp(&b.id));
    Self { inner: Arc::new(LocalData { words, exercises, units }) }
  }

  /// Built-in seeds plus the config bank. Config entries win on id clashes;
  /// a non-empty config curriculum replaces the seed curriculum.
  pub fn from_config(cfg: Option<&AppConfig>) -> Self {
    let mut words: HashMap<String, VocabularyEntry> = HashMap::new();
    let mut exercises: Vec<Exercise> = Vec::new();
    let mut units = Vec::new();

    if let Some(cfg) = cfg {
      for w in &cfg.vocabulary {
        words.insert(w.id.clone(), w.clone());
      }
      for ec in &cfg.exercises {
        let id = ec.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        if ec.solutions.is_empty() {
          warn!(target: "exercise", %id, "Skipping bank exercise: no accepted solutions.");
          continue;
        }
        exercises.push(Exercise {
          id,
          kind: ec.kind,
          sentence: ec.sentence.clone(),
          solutions: ec.solutions.clone(),
          solution_word_ids: ec.solution_word_ids.clone(),
          voice: ec.voice,
        });
      }
      units = cfg.units.clone();
    }

    for w in seed_vocabulary() {
      words.entry(w.id.clone()).or_insert(w);
    }
    let known: HashSet<String> = exercises.iter().map(|e| e.id.clone()).collect();
    exercises.extend(seed_exercises().into_iter().filter(|e| !known.contains(&e.id)));
    if units.is_empty() {
      units = seed_curriculum();
    }

    info!(target: "milim_backend", words = words.len(), exercises = exercises.len(), units = units.len(), "Local content store ready");
    Self::new(words.into_values().collect(), exercises, units)
  }

  pub fn units(&self) -> &[Unit] {
    &self.inner.units
  }

  fn exercises_by_ids(&self, ids: &[String]) -> Vec<Exercise> {
    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    self.inner.exercises.iter().filter(|e| wanted.contains(e.id.as_str())).cloned().collect()
  }

  fn words_by_ids(&self, ids: &[String]) -> Vec<VocabularyEntry> {
    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    self.inner.words.iter().filter(|w| wanted.contains(w.id.as_str())).cloned().collect()
  }

  fn distractor_pool(&self, exclude_ids: &[String], exclude_base_ids: &[String], limit: usize) -> Vec<VocabularyEntry> {
    let ids: HashSet<&str> = exclude_ids.iter().map(String::as_str).collect();
    let bases: HashSet<&str> = exclude_base_ids.iter().map(String::as_str).collect();
    self
      .inner
      .words
      .iter()
      .filter(|w| !ids.contains(w.id.as_str()) && !bases.contains(w.id.as_str()))
      .filter(|w| !w.base_word_id.as_deref().is_some_and(|b| bases.contains(b) || ids.contains(b)))
      .take(limit)
      .cloned()
      .collect()
  }
}

// -------- PostgREST backend --------

#[derive(Clone)]
pub struct RestBackend {
  pub client: reqwest::Client,
  pub base_url: String,
  api_key: String,
}

impl RestBackend {
  /// Construct the client if we find SUPABASE_URL and SUPABASE_ANON_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let base_url = std::env::var("SUPABASE_URL").ok()?;
    let api_key = std::env::var("SUPABASE_ANON_KEY").ok()?;
    Self::new(&base_url, &api_key)
  }

  pub fn new(base_url: &str, api_key: &str) -> Option<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(15))
      .build()
      .ok()?;
    Some(Self { client, base_url: base_url.trim_end_matches('/').to_string(), api_key: api_key.to_string() })
  }

  #[instrument(level = "info", skip(self, query), fields(%table))]
  async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>, DataError> {
    let url = format!("{}/rest/v1/{}", self.base_url, table);
    let start = std::time::Instant::now();
    let res = self.client.get(&url)
      .query(query)
      .header(USER_AGENT, "milim-backend/0.1")
      .header(ACCEPT, "application/json")
      .header("apikey", &self.api_key)
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_rest_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(DataError::Status { status, message });
    }

    let rows: Vec<T> = res.json().await?;
    info!(elapsed = ?start.elapsed(), rows = rows.len(), "Data service rows received");
    Ok(rows)
  }

  async fn fetch_exercises_by_ids(&self, ids: &[String]) -> Result<Vec<Exercise>, DataError> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let rows: Vec<ExerciseRow> = self.select("exercises", &[("select", "*".into()), ("id", pg_in(ids))]).await?;
    Ok(rows.into_iter().filter_map(ExerciseRow::into_exercise).collect())
  }

  async fn fetch_words_by_ids(&self, ids: &[String]) -> Result<Vec<VocabularyEntry>, DataError> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let rows: Vec<WordRow> = self.select("words", &[("select", "*".into()), ("id", pg_in(ids))]).await?;
    Ok(rows.into_iter().map(Into::into).collect())
  }

  async fn fetch_distractor_pool(
    &self,
    exclude_ids: &[String],
    exclude_base_ids: &[String],
    limit: usize,
  ) -> Result<Vec<VocabularyEntry>, DataError> {
    let rows: Vec<WordRow> = self.select("words", &distractor_query(exclude_ids, exclude_base_ids, limit)).await?;
    Ok(rows.into_iter().map(Into::into).collect())
  }

  async fn fetch_curriculum(&self) -> Result<Vec<Unit>, DataError> {
    let rows: Vec<UnitRow> = self.select("units", &[("select", "*".into()), ("order", "orderIndex".into())]).await?;
    Ok(rows.into_iter().map(Into::into).collect())
  }
}

/// Query for the distractor pool. Rows without a base word stay eligible:
/// a bare `baseWordId=not.in.(...)` would drop them, since NULL never compares.
fn distractor_query(exclude_ids: &[String], exclude_base_ids: &[String], limit: usize) -> Vec<(&'static str, String)> {
  let mut query = vec![("select", "*".to_string())];
  if !exclude_ids.is_empty() {
    query.push(("id", format!("not.{}", pg_in(exclude_ids))));
  }
  if !exclude_base_ids.is_empty() {
    query.push(("or", format!("(baseWordId.is.null,baseWordId.not.{})", pg_in(exclude_base_ids))));
  }
  query.push(("order", "id".into()));
  query.push(("limit", limit.to_string()));
  query
}

/// PostgREST `in.(...)` list with every value double-quoted.
pub fn pg_in(values: &[String]) -> String {
  let quoted: Vec<String> = values
    .iter()
    .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
    .collect();
  format!("in.({})", quoted.join(","))
}

/// Try to extract a clean error message from a PostgREST error body.
fn extract_rest_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EObj>(body).ok().map(|e| e.message)
}

// --- Row DTOs ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExerciseRow {
  id: String,
  exercise_type: String,
  #[serde(default)] sentence: String,
  #[serde(default)] solutions: Vec<String>,
  #[serde(default)] solution_word_ids: Vec<String>,
  #[serde(default)] voice: Option<VoiceGender>,
}

impl ExerciseRow {
  fn into_exercise(self) -> Option<Exercise> {
    let Some(kind) = ExerciseKind::from_wire(&self.exercise_type) else {
      warn!(target: "exercise", id = %self.id, kind = %self.exercise_type, "Unknown exercise type; skipping");
      return None;
    };
    Some(Exercise {
      id: self.id,
      kind,
      sentence: self.sentence,
      solutions: self.solutions,
      solution_word_ids: self.solution_word_ids,
      voice: self.voice.unwrap_or_default(),
    })
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WordRow {
  id: String,
  #[serde(default)] text_en: Option<String>,
  #[serde(default)] text_he: Option<String>,
  #[serde(default)] part_of_speech: Option<String>,
  #[serde(default)] base_word_id: Option<String>,
  #[serde(default)] is_name: Option<bool>,
  #[serde(default)] gender: Option<String>,
  #[serde(default)] number: Option<String>,
}

impl From<WordRow> for VocabularyEntry {
  fn from(r: WordRow) -> Self {
    VocabularyEntry {
      id: r.id,
      text_en: r.text_en.unwrap_or_default(),
      text_he: r.text_he.unwrap_or_default(),
      part_of_speech: r.part_of_speech,
      base_word_id: r.base_word_id,
      is_name: r.is_name.unwrap_or(false),
      gender: r.gender,
      number: r.number,
    }
  }
}

#[derive(Deserialize)]
struct UnitRow {
  id: String,
  name: String,
  #[serde(default)] description: Option<String>,
  #[serde(default)] steps: Vec<StepRow>,
}

#[derive(Deserialize)]
struct StepRow {
  id: String,
  #[serde(default)] name: String,
  #[serde(default)] lessons: Vec<LessonRow>,
}

#[derive(Deserialize)]
struct LessonRow {
  id: String,
  #[serde(default)] name: String,
  #[serde(default)] exercises: Vec<String>,
}

impl From<UnitRow> for Unit {
  fn from(r: UnitRow) -> Self {
    Unit {
      id: r.id,
      name: r.name,
      description: r.description.unwrap_or_else(|| "Start your learning journey!".into()),
      steps: r.steps.into_iter().map(|s| Step {
        id: s.id,
        name: s.name,
        lessons: s.lessons.into_iter().map(|l| Lesson { id: l.id, name: l.name, exercise_ids: l.exercises }).collect(),
      }).collect(),
    }
  }
}
