//! Lesson flow: preparing exercises, tracking the learner's selection, scoring, and advancing.
//!
//! A `LessonRunner` is owned by exactly one client session. It moves through
//! Loading -> InProgress -> Complete (-> retry -> InProgress), or to Failed if
//! the lesson cannot be loaded. Each exercise attempt is Selecting until the
//! learner submits, then Scored.
//!
//! While the learner works on exercise i, exercise i+1 is prepared on a
//! background task; advancing waits for it.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::backend::DataSource;
use crate::config::LessonSettings;
use crate::distractors::{excluded_ids, select_distractors};
use crate::domain::{find_lesson, next_lesson, DisplayWord, Exercise, LessonPosition, Unit};
use crate::error::{DataError, LessonError};
use crate::matcher::{candidate_text, check_words};
use crate::sequencer::{reshuffle, sequence_exercises};
use crate::shuffle::{seed_from_ids, shuffle};
use crate::speech::SpeechRequest;
use crate::words::filter_words;

/// Collaborators handed to a runner at construction.
#[derive(Clone)]
pub struct LessonContext {
  pub data: DataSource,
  pub settings: LessonSettings,
}

/// An exercise with its word bank ready for presentation.
#[derive(Clone, Debug, Serialize)]
pub struct PreparedExercise {
  pub exercise: Exercise,
  /// Solution words plus distractors, shuffled.
  pub words: Vec<DisplayWord>,
}

/// Fetch solution words and distractors and build the word bank.
#[instrument(level = "info", skip(ctx, exercise), fields(id = %exercise.id, kind = ?exercise.kind))]
pub async fn prepare_exercise(ctx: &LessonContext, exercise: Exercise) -> Result<PreparedExercise, DataError> {
  let solution_words = ctx.data.fetch_words_by_ids(&exercise.solution_word_ids).await?;
  let count = solution_words.len();

  let (exclude_ids, exclude_base_ids) = excluded_ids(&solution_words);
  let pool = ctx
    .data
    .fetch_distractor_pool(&exclude_ids, &exclude_base_ids, count * ctx.settings.distractor_pool_factor)
    .await?;

  let seed = ctx.settings.deterministic_word_bank.then(|| seed_from_ids(&exclude_ids));
  let distractors = select_distractors(&solution_words, &pool, count, exercise.kind, seed.as_deref());
  info!(
    target: "exercise", id = %exercise.id,
    solution_words = count, distractor_words = distractors.len(), pool = pool.len(),
    "Word bank prepared"
  );

  let capitalize_for = exercise.kind.capitalizes_first_word().then(|| exercise.primary_solution()).flatten();
  let mut entries = solution_words;
  entries.extend(distractors);
  let filtered = filter_words(&entries, exercise.kind.answer_language(), capitalize_for);
  let words = shuffle(&filtered, seed.as_deref());

  Ok(PreparedExercise { exercise, words })
}

#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
pub struct ScoreState {
  pub correct: u32,
  pub total: u32,
}

impl ScoreState {
  fn record(&mut self, correct: bool) {
    self.total += 1;
    if correct {
      self.correct += 1;
    }
  }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
  pub correct: u32,
  pub total: u32,
  pub percentage: u32,
  pub passed: bool,
  /// Where "Next Lesson" leads after a pass; `None` means back to the road.
  pub next_lesson: Option<LessonPosition>,
}

impl LessonSummary {
  pub fn from_score(score: ScoreState, pass_threshold: u32, next_lesson: Option<LessonPosition>) -> Self {
    let percentage = if score.total == 0 {
      0
    } else {
      (f64::from(score.correct) * 100.0 / f64::from(score.total)).round() as u32
    };
    Self {
      correct: score.correct,
      total: score.total,
      percentage,
      passed: percentage >= pass_threshold,
      next_lesson,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LessonPhase {
  Loading,
  InProgress,
  Complete(LessonSummary),
  Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptPhase {
  Selecting,
  Scored { correct: bool },
}

struct ExerciseAttempt {
  prepared: Arc<PreparedExercise>,
  selection: Vec<DisplayWord>,
  phase: AttemptPhase,
}

impl ExerciseAttempt {
  fn new(prepared: Arc<PreparedExercise>) -> Self {
    Self { prepared, selection: Vec::new(), phase: AttemptPhase::Selecting }
  }
}

/// Result of a submitted attempt.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AnswerOutcome {
  pub correct: bool,
  pub answer: String,
  /// Primary accepted solution, shown when the answer was wrong.
  pub expected: String,
  pub score: ScoreState,
}

/// What the learner sees after pressing "next".
#[derive(Debug, PartialEq, Eq)]
pub enum Advance {
  Exercise,
  Complete(LessonSummary),
}

type Prefetch = (String, JoinHandle<Result<PreparedExercise, DataError>>);

pub struct LessonRunner {
  ctx: LessonContext,
  position: LessonPosition,
  lesson_id: String,
  order: Vec<Exercise>,
  prepared: HashMap<String, Arc<PreparedExercise>>,
  current: usize,
  attempt: Option<ExerciseAttempt>,
  score: ScoreState,
  phase: LessonPhase,
  next_lesson: Option<LessonPosition>,
  prefetch: Option<Prefetch>,
}

impl LessonRunner {
  pub fn new(ctx: LessonContext, position: LessonPosition) -> Self {
    Self {
      ctx,
      position,
      lesson_id: String::new(),
      order: Vec::new(),
      prepared: HashMap::new(),
      current: 0,
      attempt: None,
      score: ScoreState::default(),
      phase: LessonPhase::Loading,
      next_lesson: None,
      prefetch: None,
    }
  }

  /// Resolve the lesson, fetch its exercises, and present the first one.
  /// Any failure leaves the runner in the terminal Failed phase.
  #[instrument(level = "info", skip(self, units), fields(position = ?self.position))]
  pub async fn load(&mut self, units: &[Unit]) -> Result<(), LessonError> {
    match self.load_inner(units).await {
      Ok(()) => {
        self.phase = LessonPhase::InProgress;
        info!(target: "lesson", lesson = %self.lesson_id, exercises = self.order.len(), "Lesson started");
        Ok(())
      }
      Err(e) => {
        warn!(target: "lesson", position = ?self.position, error = %e, "Lesson failed to load");
        self.phase = LessonPhase::Failed(e.to_string());
        Err(e)
      }
    }
  }

  async fn load_inner(&mut self, units: &[Unit]) -> Result<(), LessonError> {
    let lesson = find_lesson(units, self.position).ok_or(LessonError::LessonNotFound)?;
    self.lesson_id = lesson.id.clone();
    self.next_lesson = next_lesson(units, self.position);

    let ids = sequence_exercises(&lesson.exercise_ids, Some(&lesson.id));
    if ids.is_empty() {
      return Err(LessonError::EmptyLesson);
    }

    let fetched = self.ctx.data.fetch_exercises_by_ids(&ids).await?;
    self.order = order_like(&ids, fetched);
    if self.order.is_empty() {
      return Err(LessonError::EmptyLesson);
    }

    let first = self.prepared_for(0).await?;
    self.attempt = Some(ExerciseAttempt::new(first));
    self.current = 0;
    self.start_prefetch();
    Ok(())
  }

  pub fn phase(&self) -> &LessonPhase {
    &self.phase
  }

  pub fn score(&self) -> ScoreState {
    self.score
  }

  /// Zero-based index of the current exercise and the lesson length.
  pub fn progress(&self) -> (usize, usize) {
    (self.current, self.order.len())
  }

  pub fn current(&self) -> Option<&PreparedExercise> {
    match self.phase {
      LessonPhase::InProgress => self.attempt.as_ref().map(|a| a.prepared.as_ref()),
      _ => None,
    }
  }

  pub fn selection(&self) -> &[DisplayWord] {
    self.attempt.as_ref().map(|a| a.selection.as_slice()).unwrap_or(&[])
  }

  pub fn attempt_phase(&self) -> Option<AttemptPhase> {
    self.attempt.as_ref().map(|a| a.phase)
  }

  fn selecting_attempt(&mut self) -> Result<&mut ExerciseAttempt, LessonError> {
    if self.phase != LessonPhase::InProgress {
      return Err(LessonError::InvalidAction("no exercise in progress"));
    }
    let attempt = self.attempt.as_mut().ok_or(LessonError::InvalidAction("no exercise in progress"))?;
    match attempt.phase {
      AttemptPhase::Selecting => Ok(attempt),
      AttemptPhase::Scored { .. } => Err(LessonError::InvalidAction("answer already submitted")),
    }
  }

  /// Append a word-bank entry to the selection.
  pub fn select(&mut self, word_id: &str) -> Result<&[DisplayWord], LessonError> {
    let attempt = self.selecting_attempt()?;
    if attempt.selection.iter().any(|w| w.entry.id == word_id) {
      return Err(LessonError::InvalidAction("word already selected"));
    }
    let word = attempt
      .prepared
      .words
      .iter()
      .find(|w| w.entry.id == word_id)
      .cloned()
      .ok_or_else(|| LessonError::UnknownWord(word_id.to_string()))?;
    attempt.selection.push(word);
    Ok(&attempt.selection)
  }

  /// Remove a word from the selection; later words keep their order.
  pub fn deselect(&mut self, word_id: &str) -> Result<&[DisplayWord], LessonError> {
    let attempt = self.selecting_attempt()?;
    let before = attempt.selection.len();
    attempt.selection.retain(|w| w.entry.id != word_id);
    if attempt.selection.len() == before {
      return Err(LessonError::UnknownWord(word_id.to_string()));
    }
    Ok(&attempt.selection)
  }

  /// Score the current selection. Runs the matcher exactly once per exercise.
  #[instrument(level = "info", skip(self), fields(lesson = %self.lesson_id, index = self.current))]
  pub fn submit(&mut self) -> Result<AnswerOutcome, LessonError> {
    let attempt = self.selecting_attempt()?;
    if attempt.selection.is_empty() {
      return Err(LessonError::InvalidAction("select at least one word"));
    }
    let exercise = &attempt.prepared.exercise;
    let correct = check_words(&attempt.selection, &exercise.solutions);
    let texts: Vec<&str> = attempt.selection.iter().map(|w| w.display_text.as_str()).collect();
    let answer = candidate_text(&texts);
    let expected = exercise.primary_solution().unwrap_or_default().to_string();
    attempt.phase = AttemptPhase::Scored { correct };
    let exercise_id = exercise.id.clone();

    self.score.record(correct);
    info!(target: "exercise", id = %exercise_id, %correct, correct_total = self.score.correct, total = self.score.total, "Answer scored");
    Ok(AnswerOutcome { correct, answer, expected, score: self.score })
  }

  /// Move past a scored exercise: present the next one or complete the lesson.
  #[instrument(level = "info", skip(self), fields(lesson = %self.lesson_id, index = self.current))]
  pub async fn next_exercise(&mut self) -> Result<Advance, LessonError> {
    if self.phase != LessonPhase::InProgress {
      return Err(LessonError::InvalidAction("no exercise in progress"));
    }
    if !matches!(self.attempt_phase(), Some(AttemptPhase::Scored { .. })) {
      return Err(LessonError::InvalidAction("submit an answer first"));
    }

    let next = self.current + 1;
    if next >= self.order.len() {
      let summary = self.summary();
      info!(target: "lesson", lesson = %self.lesson_id, correct = summary.correct, total = summary.total, passed = summary.passed, "Lesson complete");
      self.phase = LessonPhase::Complete(summary.clone());
      self.attempt = None;
      return Ok(Advance::Complete(summary));
    }

    match self.prepared_for(next).await {
      Ok(prepared) => {
        self.current = next;
        self.attempt = Some(ExerciseAttempt::new(prepared));
        self.start_prefetch();
        Ok(Advance::Exercise)
      }
      Err(e) => {
        warn!(target: "lesson", lesson = %self.lesson_id, error = %e, "Failed to prepare next exercise");
        self.phase = LessonPhase::Failed(e.to_string());
        Err(e.into())
      }
    }
  }

  /// Start over after completion with a fresh order and a cleared score.
  /// Prepared word banks are reused.
  #[instrument(level = "info", skip(self), fields(lesson = %self.lesson_id))]
  pub async fn retry(&mut self) -> Result<(), LessonError> {
    if !matches!(self.phase, LessonPhase::Complete(_)) {
      return Err(LessonError::InvalidAction("lesson is not complete"));
    }
    self.abort_prefetch();
    self.order = reshuffle(&self.order);
    self.score = ScoreState::default();
    self.current = 0;

    match self.prepared_for(0).await {
      Ok(first) => {
        self.attempt = Some(ExerciseAttempt::new(first));
        self.phase = LessonPhase::InProgress;
        self.start_prefetch();
        info!(target: "lesson", lesson = %self.lesson_id, "Lesson retried");
        Ok(())
      }
      Err(e) => {
        self.phase = LessonPhase::Failed(e.to_string());
        Err(e.into())
      }
    }
  }

  pub fn summary(&self) -> LessonSummary {
    LessonSummary::from_score(self.score, self.ctx.settings.pass_threshold, self.next_lesson)
  }

  /// Audio for the current prompt, in the prompt's language and voice.
  pub fn speech_request(&self, slow: bool) -> Option<SpeechRequest> {
    let exercise = &self.current()?.exercise;
    Some(SpeechRequest {
      text: exercise.sentence.clone(),
      language: exercise.kind.prompt_language(),
      voice: exercise.voice,
      slow,
    })
  }

  /// Cached word bank, the pending prefetch, or a fresh preparation, in that order.
  async fn prepared_for(&mut self, index: usize) -> Result<Arc<PreparedExercise>, DataError> {
    let exercise = self.order[index].clone();
    if let Some(p) = self.prepared.get(&exercise.id) {
      return Ok(p.clone());
    }

    let pending = match self.prefetch.take() {
      Some((id, handle)) if id == exercise.id => Some(handle),
      Some((_, stale)) => {
        stale.abort();
        None
      }
      None => None,
    };

    let result = match pending {
      Some(handle) => match handle.await {
        Ok(r) => r,
        Err(join) => {
          debug!(target: "lesson", error = %join, "Prefetch task ended early; preparing inline");
          prepare_exercise(&self.ctx, exercise.clone()).await
        }
      },
      None => prepare_exercise(&self.ctx, exercise.clone()).await,
    };

    let prepared = Arc::new(result?);
    self.prepared.insert(exercise.id, prepared.clone());
    Ok(prepared)
  }

  fn start_prefetch(&mut self) {
    let next = self.current + 1;
    let Some(exercise) = self.order.get(next).cloned() else { return };
    if self.prepared.contains_key(&exercise.id) {
      return;
    }
    self.abort_prefetch();
    let ctx = self.ctx.clone();
    let id = exercise.id.clone();
    debug!(target: "lesson", %id, "Prefetching next exercise");
    let handle = tokio::spawn(async move { prepare_exercise(&ctx, exercise).await });
    self.prefetch = Some((id, handle));
  }

  fn abort_prefetch(&mut self) {
    if let Some((_, handle)) = self.prefetch.take() {
      handle.abort();
    }
  }
}

impl Drop for LessonRunner {
  fn drop(&mut self) {
    self.abort_prefetch();
  }
}

/// Arrange fetched exercises in `ids` order, dropping unknown ids and
/// exercises that have no accepted solution.
fn order_like(ids: &[String], fetched: Vec<Exercise>) -> Vec<Exercise> {
  let mut by_id: HashMap<String, Exercise> = fetched.into_iter().map(|e| (e.id.clone(), e)).collect();
  ids
    .iter()
    .filter_map(|id| by_id.remove(id))
    .filter(|e| {
      let ok = !e.solutions.is_empty();
      if !ok {
        warn!(target: "exercise", id = %e.id, "Exercise has no accepted solutions; skipping");
      }
      ok
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::{LocalStore, RestBackend};
  use crate::domain::{ExerciseKind, Language, Lesson, Step, VocabularyEntry, VoiceGender};
  use crate::seeds::{seed_curriculum, seed_exercises, seed_vocabulary};
  use pretty_assertions::assert_eq;

  fn ctx_with(store: LocalStore) -> LessonContext {
    LessonContext { data: DataSource::Local(store), settings: LessonSettings::default() }
  }

  fn seeded_ctx() -> LessonContext {
    ctx_with(LocalStore::from_config(None))
  }

  fn pos(lesson: usize) -> LessonPosition {
    LessonPosition { unit: 0, step: 0, lesson }
  }

  fn single_lesson(ids: &[&str]) -> Vec<Unit> {
    vec![Unit {
      id: "u".into(),
      name: "U".into(),
      description: String::new(),
      steps: vec![Step {
        id: "s".into(),
        name: "S".into(),
        lessons: vec![Lesson {
          id: "l-test".into(),
          name: "T".into(),
          exercise_ids: ids.iter().map(|s| s.to_string()).collect(),
        }],
      }],
    }]
  }

  fn solution_ids(runner: &LessonRunner) -> Vec<String> {
    runner.current().unwrap().exercise.solution_word_ids.clone()
  }

  /// Select the solution words in order, or swap the last two to answer wrongly.
  fn answer(runner: &mut LessonRunner, right: bool) -> AnswerOutcome {
    let prepared = runner.current().unwrap().clone();
    let lang = prepared.exercise.kind.answer_language();
    let mut ids: Vec<String> = prepared
      .exercise
      .solution_word_ids
      .iter()
      .filter(|id| prepared.words.iter().any(|w| &w.entry.id == *id && w.entry.has_text(lang)))
      .cloned()
      .collect();
    if !right {
      let n = ids.len();
      ids.swap(n - 1, n - 2);
    }
    for id in &ids {
      runner.select(id).unwrap();
    }
    runner.submit().unwrap()
  }

  #[tokio::test]
  async fn prepared_bank_holds_solutions_and_disjoint_distractors() {
    let ctx = seeded_ctx();
    let ex = seed_exercises().into_iter().find(|e| e.id == "e-cat-1").unwrap();
    let prepared = prepare_exercise(&ctx, ex).await.unwrap();
    let ids: Vec<&str> = prepared.words.iter().map(|w| w.entry.id.as_str()).collect();
    for sol in ["w-i", "w-see", "w-cat"] {
      assert!(ids.contains(&sol));
    }
    assert_eq!(prepared.words.len(), 6);
    for banned in ["w-saw", "w-cats"] {
      assert!(!ids.contains(&banned), "{banned} shares a lemma with a solution");
    }
    assert!(prepared.words.iter().all(|w| !w.display_text.trim().is_empty()));
  }

  #[tokio::test]
  async fn deterministic_banks_repeat() {
    let ctx = seeded_ctx();
    let ex = seed_exercises().into_iter().find(|e| e.id == "e-house-1").unwrap();
    let a = prepare_exercise(&ctx, ex.clone()).await.unwrap();
    let b = prepare_exercise(&ctx, ex).await.unwrap();
    assert_eq!(a.words, b.words);
  }

  #[tokio::test]
  async fn english_answers_capitalize_the_first_word() {
    let ctx = seeded_ctx();
    let ex = seed_exercises().into_iter().find(|e| e.id == "e-hello-1").unwrap();
    let prepared = prepare_exercise(&ctx, ex).await.unwrap();
    let hello = prepared.words.iter().find(|w| w.entry.id == "w-hello").unwrap();
    let world = prepared.words.iter().find(|w| w.entry.id == "w-world").unwrap();
    assert_eq!(hello.display_text, "Hello");
    assert_eq!(world.display_text, "world");
  }

  #[tokio::test]
  async fn hebrew_scenario_scores_by_order() {
    let ctx = seeded_ctx();
    let units = single_lesson(&["e-cat-1"]);
    let mut runner = LessonRunner::new(ctx.clone(), pos(0));
    runner.load(&units).await.unwrap();
    for id in ["w-i", "w-see", "w-cat"] {
      runner.select(id).unwrap();
    }
    let out = runner.submit().unwrap();
    assert!(out.correct);
    assert_eq!(out.answer, "אני רואה חתול");

    let mut runner = LessonRunner::new(ctx, pos(0));
    runner.load(&units).await.unwrap();
    for id in ["w-i", "w-cat", "w-see"] {
      runner.select(id).unwrap();
    }
    let out = runner.submit().unwrap();
    assert!(!out.correct);
    assert_eq!(out.expected, "אני רואה חתול");
  }

  #[tokio::test]
  async fn selection_rules() {
    let mut runner = LessonRunner::new(seeded_ctx(), pos(0));
    runner.load(&single_lesson(&["e-cat-1"])).await.unwrap();

    assert!(matches!(runner.submit(), Err(LessonError::InvalidAction(_))));
    assert!(matches!(runner.select("w-nope"), Err(LessonError::UnknownWord(_))));
    runner.select("w-i").unwrap();
    assert!(matches!(runner.select("w-i"), Err(LessonError::InvalidAction(_))));
    runner.select("w-see").unwrap();
    runner.select("w-cat").unwrap();
    let left = runner.deselect("w-see").unwrap();
    let texts: Vec<&str> = left.iter().map(|w| w.display_text.as_str()).collect();
    assert_eq!(texts, vec!["אני", "חתול"]);
    assert!(matches!(runner.deselect("w-see"), Err(LessonError::UnknownWord(_))));

    assert!(matches!(runner.next_exercise().await, Err(LessonError::InvalidAction(_))));
    runner.submit().unwrap();
    assert!(matches!(runner.select("w-see"), Err(LessonError::InvalidAction(_))));
    assert!(matches!(runner.submit(), Err(LessonError::InvalidAction(_))));
  }

  #[tokio::test]
  async fn three_of_five_passes_and_points_to_next_lesson() {
    let mut runner = LessonRunner::new(seeded_ctx(), pos(0));
    runner.load(&seed_curriculum()).await.unwrap();
    assert_eq!(runner.progress(), (0, 5));

    let mut advance = None;
    for i in 0..5 {
      answer(&mut runner, i < 3);
      advance = Some(runner.next_exercise().await.unwrap());
    }
    let expected = LessonSummary {
      correct: 3,
      total: 5,
      percentage: 60,
      passed: true,
      next_lesson: Some(pos(1)),
    };
    assert_eq!(advance, Some(Advance::Complete(expected.clone())));
    assert_eq!(runner.phase(), &LessonPhase::Complete(expected));
    assert!(runner.current().is_none());
  }

  #[tokio::test]
  async fn two_of_five_fails_and_retry_resets() {
    let mut runner = LessonRunner::new(seeded_ctx(), pos(1));
    runner.load(&seed_curriculum()).await.unwrap();
    for i in 0..5 {
      answer(&mut runner, i < 2);
      runner.next_exercise().await.unwrap();
    }
    let summary = runner.summary();
    assert_eq!(summary.percentage, 40);
    assert!(!summary.passed);
    assert_eq!(summary.next_lesson, None);

    runner.retry().await.unwrap();
    assert_eq!(runner.phase(), &LessonPhase::InProgress);
    assert_eq!(runner.score(), ScoreState::default());
    assert_eq!(runner.progress(), (0, 5));
    assert!(runner.selection().is_empty());
    assert!(matches!(runner.retry().await, Err(LessonError::InvalidAction(_))));
  }

  #[tokio::test]
  async fn seeded_order_is_stable_across_loads() {
    let units = seed_curriculum();
    let mut a = LessonRunner::new(seeded_ctx(), pos(0));
    let mut b = LessonRunner::new(seeded_ctx(), pos(0));
    a.load(&units).await.unwrap();
    b.load(&units).await.unwrap();
    assert_eq!(solution_ids(&a), solution_ids(&b));
    assert_eq!(a.current().unwrap().exercise.id, b.current().unwrap().exercise.id);
  }

  #[tokio::test]
  async fn missing_and_empty_lessons_fail_terminally() {
    let mut runner = LessonRunner::new(seeded_ctx(), pos(9));
    assert!(matches!(runner.load(&seed_curriculum()).await, Err(LessonError::LessonNotFound)));
    assert!(matches!(runner.phase(), LessonPhase::Failed(_)));

    let mut runner = LessonRunner::new(seeded_ctx(), pos(0));
    let err = runner.load(&single_lesson(&["e-unknown"])).await.unwrap_err();
    assert!(matches!(err, LessonError::EmptyLesson));
    assert!(err.is_terminal());
  }

  #[tokio::test]
  async fn exercises_without_solutions_are_skipped() {
    let mut broken = seed_exercises().into_iter().find(|e| e.id == "e-cat-1").unwrap();
    broken.id = "e-broken".into();
    broken.solutions.clear();
    let mut exercises = seed_exercises();
    exercises.push(broken);
    let ctx = ctx_with(LocalStore::new(seed_vocabulary(), exercises, Vec::new()));

    let mut runner = LessonRunner::new(ctx, pos(0));
    runner.load(&single_lesson(&["e-broken", "e-dog-1"])).await.unwrap();
    assert_eq!(runner.progress(), (0, 1));
    assert_eq!(runner.current().unwrap().exercise.id, "e-dog-1");
  }

  #[tokio::test]
  async fn fetch_failure_is_a_terminal_data_error() {
    let rest = RestBackend::new("http://127.0.0.1:9", "key").unwrap();
    let ctx = LessonContext { data: DataSource::Rest(rest), settings: LessonSettings::default() };
    let mut runner = LessonRunner::new(ctx, pos(0));
    let err = runner.load(&seed_curriculum()).await.unwrap_err();
    assert!(matches!(err, LessonError::DataFetch(_)));
    assert!(matches!(runner.phase(), LessonPhase::Failed(_)));
  }

  #[tokio::test]
  async fn speech_request_follows_prompt_language() {
    let mut runner = LessonRunner::new(seeded_ctx(), pos(0));
    runner.load(&single_lesson(&["e-hello-1"])).await.unwrap();
    let req = runner.speech_request(true).unwrap();
    assert_eq!(req.language, Language::He);
    assert_eq!(req.voice, VoiceGender::Female);
    assert_eq!(req.text, "שלום עולם");
    assert!(req.slow);
  }

  #[tokio::test]
  async fn names_and_articles_survive_word_filtering() {
    let mut words = seed_vocabulary();
    words.push(VocabularyEntry {
      id: "w-empty".into(),
      text_en: " ".into(),
      text_he: " ".into(),
      part_of_speech: None,
      base_word_id: None,
      is_name: false,
      gender: None,
      number: None,
    });
    let ex = Exercise {
      id: "e-a".into(),
      kind: ExerciseKind::ListenEnToTextHe,
      sentence: "A dog".into(),
      solutions: vec!["כלב".into()],
      solution_word_ids: vec!["w-a".into(), "w-dog".into()],
      voice: VoiceGender::Male,
    };
    let ctx = ctx_with(LocalStore::new(words, vec![ex.clone()], Vec::new()));
    let prepared = prepare_exercise(&ctx, ex).await.unwrap();
    assert!(prepared.words.iter().all(|w| w.entry.id != "w-a" && w.entry.id != "w-empty"));
    assert!(prepared.words.iter().any(|w| w.entry.id == "w-dog"));
  }

  fn unreachable() -> DataSource {
    DataSource::Rest(RestBackend::new("http://127.0.0.1:9", "key").unwrap())
  }

  #[tokio::test]
  async fn next_exercise_takes_the_prefetched_bank() {
    let mut runner = LessonRunner::new(seeded_ctx(), pos(0));
    runner.load(&seed_curriculum()).await.unwrap();
    let second = runner.order[1].id.clone();
    assert_eq!(runner.prefetch.as_ref().map(|(id, _)| id.clone()), Some(second.clone()));
    assert!(!runner.prepared.contains_key(&second));

    // Inline preparation would now fail; only the spawned task can supply the bank.
    runner.ctx.data = unreachable();
    answer(&mut runner, true);
    assert_eq!(runner.next_exercise().await.unwrap(), Advance::Exercise);
    assert_eq!(runner.current().unwrap().exercise.id, second);
    assert!(runner.prepared.contains_key(&second));
    assert_eq!(runner.prefetch.as_ref().map(|(id, _)| id.clone()), Some(runner.order[2].id.clone()));
  }

  #[tokio::test]
  async fn failed_prefetch_fails_the_lesson() {
    let mut runner = LessonRunner::new(seeded_ctx(), pos(0));
    runner.load(&seed_curriculum()).await.unwrap();
    runner.ctx.data = unreachable();
    runner.start_prefetch();

    answer(&mut runner, true);
    let err = runner.next_exercise().await.unwrap_err();
    assert!(matches!(err, LessonError::DataFetch(DataError::Request(_))));
    assert!(err.is_terminal());
    assert!(matches!(runner.phase(), LessonPhase::Failed(_)));
    assert!(runner.current().is_none());
  }

  #[tokio::test]
  async fn dropping_the_runner_aborts_the_prefetch() {
    // Accepts connections into its backlog but never answers.
    let silent = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = silent.local_addr().unwrap();

    let mut runner = LessonRunner::new(seeded_ctx(), pos(0));
    runner.load(&seed_curriculum()).await.unwrap();
    runner.ctx.data = DataSource::Rest(RestBackend::new(&format!("http://{addr}"), "key").unwrap());
    runner.start_prefetch();
    let task = runner.prefetch.as_ref().map(|(_, h)| h.abort_handle()).unwrap();
    tokio::task::yield_now().await;
    assert!(!task.is_finished());

    drop(runner);
    for _ in 0..100 {
      if task.is_finished() {
        break;
      }
      tokio::task::yield_now().await;
    }
    assert!(task.is_finished());
    drop(silent);
  }

  #[test]
  fn percentage_rounds_and_handles_zero() {
    let s = |c, t| ScoreState { correct: c, total: t };
    assert_eq!(LessonSummary::from_score(s(0, 0), 60, None).percentage, 0);
    assert_eq!(LessonSummary::from_score(s(2, 3), 60, None).percentage, 67);
    assert!(LessonSummary::from_score(s(3, 5), 60, None).passed);
    assert!(!LessonSummary::from_score(s(2, 5), 60, None).passed);
  }
}
