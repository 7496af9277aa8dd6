//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{DisplayWord, ExerciseKind, Language, Lesson, LessonPosition, Unit, VoiceGender};
use crate::lesson::{AnswerOutcome, LessonSummary, PreparedExercise, ScoreState};

/// Messages the client can send over WebSocket.
/// Lesson coordinates are 1-based, as in `/lesson/1/1/1`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartLesson {
        unit: usize,
        step: usize,
        lesson: usize,
    },
    SelectWord {
        #[serde(rename = "wordId")]
        word_id: String,
    },
    DeselectWord {
        #[serde(rename = "wordId")]
        word_id: String,
    },
    Submit,
    Next,
    Retry,
    Speak {
        #[serde(default)]
        slow: bool,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Exercise {
        exercise: ExerciseOut,
        score: ScoreState,
    },
    Selection {
        selected: Vec<WordOut>,
        text: String,
    },
    AnswerResult {
        correct: bool,
        answer: String,
        expected: String,
        score: ScoreState,
    },
    LessonComplete {
        summary: LessonSummary,
    },
    Audio {
        mime: String,
        #[serde(rename = "audioBase64")]
        audio_base64: String,
    },
    AudioUnavailable,
    LessonFailed {
        message: String,
    },
    Error {
        message: String,
    },
}

impl From<AnswerOutcome> for ServerWsMessage {
    fn from(o: AnswerOutcome) -> Self {
        ServerWsMessage::AnswerResult { correct: o.correct, answer: o.answer, expected: o.expected, score: o.score }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordOut {
    pub id: String,
    pub text: String,
}

impl From<&DisplayWord> for WordOut {
    fn from(w: &DisplayWord) -> Self {
        WordOut { id: w.entry.id.clone(), text: w.display_text.clone() }
    }
}

pub fn words_out(words: &[DisplayWord]) -> Vec<WordOut> {
    words.iter().map(WordOut::from).collect()
}

/// DTO used by both WS and HTTP for exercise delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseOut {
    pub id: String,
    pub kind: ExerciseKind,
    pub title: String,
    /// Sentence shown on screen. Listening exercises only play it.
    pub prompt: Option<String>,
    pub audio_language: Language,
    pub voice: VoiceGender,
    pub words: Vec<WordOut>,
    pub index: usize,
    pub total: usize,
}

/// Convert a prepared exercise (internal) to the public DTO.
pub fn to_out(p: &PreparedExercise, index: usize, total: usize) -> ExerciseOut {
    let ex = &p.exercise;
    let shows_sentence = matches!(ex.kind, ExerciseKind::TranslateEnToHe | ExerciseKind::TranslateHeToEn);
    ExerciseOut {
        id: ex.id.clone(),
        kind: ex.kind,
        title: ex.kind.title().to_string(),
        prompt: shows_sentence.then(|| ex.sentence.clone()),
        audio_language: ex.kind.prompt_language(),
        voice: ex.voice,
        words: words_out(&p.words),
        index,
        total,
    }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct CurriculumOut {
    pub units: Vec<Unit>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlanOut {
    pub position: LessonPosition,
    pub lesson_id: String,
    pub name: String,
    /// Presentation order, stable per lesson.
    pub exercise_ids: Vec<String>,
    pub next_lesson: Option<LessonPosition>,
}

impl LessonPlanOut {
    pub fn new(position: LessonPosition, lesson: &Lesson, exercise_ids: Vec<String>, next_lesson: Option<LessonPosition>) -> Self {
        Self { position, lesson_id: lesson.id.clone(), name: lesson.name.clone(), exercise_ids, next_lesson }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerIn {
    pub exercise_id: String,
    pub selected_word_ids: Vec<String>,
}
#[derive(Serialize)]
pub struct AnswerOut {
    pub correct: bool,
    pub answer: String,
    pub expected: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub source: &'static str,
    pub speech: bool,
}
