//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Resolving a lesson plan (sequenced exercise ids)
//!   - Preparing a single exercise by id
//!   - Stateless answer checking from a list of selected word ids
//!   - Speech synthesis with failures logged and swallowed

use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};

use crate::domain::{find_lesson, next_lesson, LessonPosition, VocabularyEntry};
use crate::error::{ApiError, LessonError};
use crate::lesson::{prepare_exercise, PreparedExercise};
use crate::matcher::{candidate_text, check_answer};
use crate::protocol::LessonPlanOut;
use crate::sequencer::sequence_exercises;
use crate::speech::SpeechRequest;
use crate::state::AppState;
use crate::words::filter_words;

#[instrument(level = "info", skip(state), fields(pos = ?pos))]
pub async fn lesson_plan(state: &AppState, pos: LessonPosition) -> Result<LessonPlanOut, ApiError> {
  let units = state.curriculum().await?;
  let lesson = find_lesson(&units, pos).ok_or(LessonError::LessonNotFound)?;
  if lesson.exercise_ids.is_empty() {
    return Err(LessonError::EmptyLesson.into());
  }
  let ids = sequence_exercises(&lesson.exercise_ids, Some(&lesson.id));
  Ok(LessonPlanOut::new(pos, lesson, ids, next_lesson(&units, pos)))
}

#[instrument(level = "info", skip(state), fields(%exercise_id))]
pub async fn prepare_by_id(state: &AppState, exercise_id: &str) -> Result<PreparedExercise, ApiError> {
  let ids = vec![exercise_id.to_string()];
  let exercise = state
    .data
    .fetch_exercises_by_ids(&ids)
    .await?
    .into_iter()
    .next()
    .filter(|e| !e.solutions.is_empty())
    .ok_or_else(|| ApiError::NotFound(format!("exercise {exercise_id}")))?;
  Ok(prepare_exercise(&state.lesson_context(), exercise).await?)
}

/// Check a selection given as word ids, in selection order.
/// Returns (correct, candidate answer, expected answer).
#[instrument(level = "info", skip(state, selected), fields(%exercise_id, selected = selected.len()))]
pub async fn check_selection(state: &AppState, exercise_id: &str, selected: &[String]) -> Result<(bool, String, String), ApiError> {
  let ids = vec![exercise_id.to_string()];
  let exercise = state
    .data
    .fetch_exercises_by_ids(&ids)
    .await?
    .into_iter()
    .next()
    .ok_or_else(|| ApiError::NotFound(format!("exercise {exercise_id}")))?;

  let fetched: HashMap<String, VocabularyEntry> = state
    .data
    .fetch_words_by_ids(selected)
    .await?
    .into_iter()
    .map(|w| (w.id.clone(), w))
    .collect();
  let entries = selected
    .iter()
    .map(|id| fetched.get(id).cloned().ok_or_else(|| LessonError::UnknownWord(id.clone())))
    .collect::<Result<Vec<_>, _>>()?;

  let capitalize_for = exercise.kind.capitalizes_first_word().then(|| exercise.primary_solution()).flatten();
  let words = filter_words(&entries, exercise.kind.answer_language(), capitalize_for);
  if words.len() != entries.len() {
    return Err(ApiError::BadRequest("selected word has no text in the answer language".into()));
  }
  let texts: Vec<&str> = words.iter().map(|w| w.display_text.as_str()).collect();
  let correct = check_answer(&texts, &exercise.solutions);
  let expected = exercise.primary_solution().unwrap_or_default().to_string();
  info!(target: "exercise", id = %exercise.id, %correct, "Stateless answer check");
  Ok((correct, candidate_text(&texts), expected))
}

/// Synthesize audio, or `None` when speech is off or the call fails.
/// Audio problems never block an exercise.
#[instrument(level = "info", skip(state, req), fields(text_len = req.text.len()))]
pub async fn speak(state: &AppState, req: &SpeechRequest) -> Option<Vec<u8>> {
  let Some(client) = &state.speech else {
    debug!(target: "milim_backend", "Speech requested but disabled.");
    return None;
  };
  match client.synthesize(req).await {
    Ok(audio) => Some(audio),
    Err(e) => {
      warn!(target: "milim_backend", error = %e, "Speech synthesis failed; continuing without audio.");
      None
    }
  }
}
