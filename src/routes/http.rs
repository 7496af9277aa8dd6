//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, State},
  http::header::CONTENT_TYPE,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::domain::LessonPosition;
use crate::error::{ApiError, LessonError, SpeechError};
use crate::logic::*;
use crate::protocol::*;
use crate::speech::SpeechRequest;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, source: state.data.kind(), speech: state.speech.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_curriculum(State(state): State<Arc<AppState>>) -> Result<Json<CurriculumOut>, ApiError> {
  let units = state.curriculum().await?;
  info!(target: "lesson", units = units.len(), "HTTP curriculum served");
  Ok(Json(CurriculumOut { units }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_lesson(
  State(state): State<Arc<AppState>>,
  Path((unit, step, lesson)): Path<(usize, usize, usize)>,
) -> Result<Json<LessonPlanOut>, ApiError> {
  let pos = LessonPosition::from_one_based(unit, step, lesson).ok_or(LessonError::LessonNotFound)?;
  let plan = lesson_plan(&state, pos).await?;
  info!(target: "lesson", id = %plan.lesson_id, exercises = plan.exercise_ids.len(), "HTTP lesson plan served");
  Ok(Json(plan))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_exercise(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ExerciseOut>, ApiError> {
  let prepared = prepare_by_id(&state, &id).await?;
  info!(target: "exercise", %id, words = prepared.words.len(), "HTTP exercise served");
  Ok(Json(to_out(&prepared, 0, 1)))
}

#[instrument(level = "info", skip(state, body), fields(%body.exercise_id, selected = body.selected_word_ids.len()))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<AnswerOut>, ApiError> {
  if body.selected_word_ids.is_empty() {
    return Err(ApiError::BadRequest("select at least one word".into()));
  }
  let (correct, answer, expected) = check_selection(&state, &body.exercise_id, &body.selected_word_ids).await?;
  Ok(Json(AnswerOut { correct, answer, expected }))
}

#[instrument(level = "info", skip(state, body), fields(lang = body.language.speech_code(), text_len = body.text.len()))]
pub async fn http_post_speak(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SpeechRequest>,
) -> Result<impl IntoResponse, ApiError> {
  if body.text.trim().is_empty() {
    return Err(ApiError::BadRequest("text is required".into()));
  }
  if state.speech.is_none() {
    return Err(SpeechError::NotConfigured.into());
  }
  let audio = speak(&state, &body).await.ok_or_else(|| ApiError::Upstream("speech synthesis failed".into()))?;
  Ok(([(CONTENT_TYPE, "audio/mpeg")], audio))
}
