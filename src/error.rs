//! Error types: data service, lesson flow, speech, and the HTTP mapping.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;

/// A curriculum, exercise, or vocabulary lookup failed.
#[derive(Debug, Error)]
pub enum DataError {
  #[error("request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("data service HTTP {status}: {message}")]
  Status { status: u16, message: String },
}

#[derive(Debug, Error)]
pub enum LessonError {
  #[error("failed to load lesson: {0}")]
  DataFetch(#[from] DataError),

  #[error("lesson not found")]
  LessonNotFound,

  #[error("no exercises found")]
  EmptyLesson,

  #[error("{0}")]
  InvalidAction(&'static str),

  #[error("word {0} is not in the word bank")]
  UnknownWord(String),
}

impl LessonError {
  /// Errors that end the lesson. Invalid actions leave the session usable.
  pub fn is_terminal(&self) -> bool {
    matches!(self, LessonError::DataFetch(_) | LessonError::LessonNotFound | LessonError::EmptyLesson)
  }
}

/// Speech synthesis failed or produced nothing. Never blocks an exercise.
#[derive(Debug, Error)]
pub enum SpeechError {
  #[error("speech synthesis is not configured")]
  NotConfigured,

  #[error("speech request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("speech HTTP {status}: {message}")]
  Status { status: u16, message: String },

  #[error("speech response carried no audio")]
  NoAudio,

  #[error("audio decode failed: {0}")]
  Decode(#[from] base64::DecodeError),
}

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Bad request: {0}")]
  BadRequest(String),

  #[error("Upstream error: {0}")]
  Upstream(String),
}

#[derive(Serialize)]
struct ErrorResponse {
  error: String,
  message: String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, error_type) = match &self {
      ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
      ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
    };
    let body = Json(ErrorResponse { error: error_type.to_string(), message: self.to_string() });
    (status, body).into_response()
  }
}

impl From<DataError> for ApiError {
  fn from(e: DataError) -> Self {
    ApiError::Upstream(e.to_string())
  }
}

impl From<LessonError> for ApiError {
  fn from(e: LessonError) -> Self {
    match e {
      LessonError::DataFetch(d) => d.into(),
      LessonError::LessonNotFound | LessonError::EmptyLesson => ApiError::NotFound(e.to_string()),
      LessonError::InvalidAction(_) | LessonError::UnknownWord(_) => ApiError::BadRequest(e.to_string()),
    }
  }
}

impl From<SpeechError> for ApiError {
  fn from(e: SpeechError) -> Self {
    ApiError::Upstream(e.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lesson_errors_map_to_statuses() {
    let r = ApiError::from(LessonError::EmptyLesson).into_response();
    assert_eq!(r.status(), StatusCode::NOT_FOUND);
    let r = ApiError::from(LessonError::UnknownWord("w9".into())).into_response();
    assert_eq!(r.status(), StatusCode::BAD_REQUEST);
    let r = ApiError::from(DataError::Status { status: 500, message: "boom".into() }).into_response();
    assert_eq!(r.status(), StatusCode::BAD_GATEWAY);
  }

  #[test]
  fn empty_lesson_is_distinct_from_fetch_failure() {
    assert_eq!(LessonError::EmptyLesson.to_string(), "no exercises found");
    let fetch = LessonError::from(DataError::Status { status: 503, message: "down".into() });
    assert_eq!(fetch.to_string(), "failed to load lesson: data service HTTP 503: down");
    assert!(fetch.is_terminal());
    assert!(!LessonError::InvalidAction("nothing selected").is_terminal());
  }
}
