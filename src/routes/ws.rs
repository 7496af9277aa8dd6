//! WebSocket upgrade + message loop. Each connection owns one lesson session;
//! client messages are parsed as JSON and drive that session. We reply with a
//! single JSON message per request.

use std::{collections::VecDeque, future::Future, sync::Arc};
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{info, error, instrument, debug, warn};

use crate::domain::LessonPosition;
use crate::error::LessonError;
use crate::lesson::{Advance, LessonRunner};
use crate::logic::speak;
use crate::protocol::{to_out, words_out, ClientWsMessage, ServerWsMessage};
use crate::matcher::candidate_text;
use crate::state::AppState;

/// Per-connection lesson state. Dropping it aborts any pending prefetch.
#[derive(Default)]
pub struct Session {
  runner: Option<LessonRunner>,
}

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "milim_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Where client frames come from.
trait FrameSource {
  async fn next_frame(&mut self) -> Option<Result<Message, axum::Error>>;
}

impl FrameSource for WebSocket {
  async fn next_frame(&mut self) -> Option<Result<Message, axum::Error>> {
    self.recv().await
  }
}

/// Drive `work` while watching the socket. Frames that arrive meanwhile are
/// queued in `pending`. Returns `None` if the client goes away first, which
/// drops `work` and any fetch it was awaiting.
async fn until_disconnect<F, S>(work: F, source: &mut S, pending: &mut VecDeque<Message>) -> Option<F::Output>
where
  F: Future,
  S: FrameSource,
{
  tokio::pin!(work);
  loop {
    tokio::select! {
      out = &mut work => return Some(out),
      frame = source.next_frame() => match frame {
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
        Some(Ok(other)) => pending.push_back(other),
      },
    }
  }
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "milim_backend", "WebSocket connected");
  let mut session = Session::default();
  let mut pending = VecDeque::new();
  loop {
    let msg = match pending.pop_front() {
      Some(m) => m,
      None => match socket.next_frame().await {
        Some(Ok(m)) => m,
        _ => break,
      },
    };
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "milim_backend", "WS received: {:?}", &incoming);
            let work = handle_client_ws(incoming, &state, &mut session);
            match until_disconnect(work, &mut socket, &mut pending).await {
              Some(reply) => reply,
              None => {
                info!(target: "milim_backend", "Client left mid-request; abandoning it");
                break;
              }
            }
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "milim_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "milim_backend", "WebSocket disconnected");
}

fn exercise_msg(runner: &LessonRunner) -> ServerWsMessage {
  match runner.current() {
    Some(p) => {
      let (index, total) = runner.progress();
      ServerWsMessage::Exercise { exercise: to_out(p, index, total), score: runner.score() }
    }
    None => ServerWsMessage::Error { message: "no exercise in progress".into() },
  }
}

fn selection_msg(runner: &LessonRunner) -> ServerWsMessage {
  let selected = runner.selection();
  let texts: Vec<&str> = selected.iter().map(|w| w.display_text.as_str()).collect();
  ServerWsMessage::Selection { selected: words_out(selected), text: candidate_text(&texts) }
}

fn lesson_error_msg(e: LessonError) -> ServerWsMessage {
  if e.is_terminal() {
    warn!(target: "lesson", error = %e, "Lesson failed");
    ServerWsMessage::LessonFailed { message: e.to_string() }
  } else {
    ServerWsMessage::Error { message: e.to_string() }
  }
}

fn no_lesson() -> ServerWsMessage {
  ServerWsMessage::Error { message: "no lesson started".into() }
}

#[instrument(level = "info", skip(state, session))]
pub async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, session: &mut Session) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::StartLesson { unit, step, lesson } => {
      let Some(pos) = LessonPosition::from_one_based(unit, step, lesson) else {
        return ServerWsMessage::LessonFailed { message: LessonError::LessonNotFound.to_string() };
      };
      // A new lesson replaces the old one; its prefetch is aborted on drop.
      session.runner = None;
      let units = match state.curriculum().await {
        Ok(u) => u,
        Err(e) => return lesson_error_msg(e.into()),
      };
      let mut runner = LessonRunner::new(state.lesson_context(), pos);
      match runner.load(&units).await {
        Ok(()) => {
          let reply = exercise_msg(&runner);
          session.runner = Some(runner);
          reply
        }
        Err(e) => lesson_error_msg(e),
      }
    }

    ClientWsMessage::SelectWord { word_id } => {
      let Some(runner) = session.runner.as_mut() else { return no_lesson() };
      match runner.select(&word_id).map(|_| ()) {
        Ok(()) => selection_msg(runner),
        Err(e) => lesson_error_msg(e),
      }
    }

    ClientWsMessage::DeselectWord { word_id } => {
      let Some(runner) = session.runner.as_mut() else { return no_lesson() };
      match runner.deselect(&word_id).map(|_| ()) {
        Ok(()) => selection_msg(runner),
        Err(e) => lesson_error_msg(e),
      }
    }

    ClientWsMessage::Submit => {
      let Some(runner) = session.runner.as_mut() else { return no_lesson() };
      match runner.submit() {
        Ok(outcome) => outcome.into(),
        Err(e) => lesson_error_msg(e),
      }
    }

    ClientWsMessage::Next => {
      let Some(runner) = session.runner.as_mut() else { return no_lesson() };
      match runner.next_exercise().await {
        Ok(Advance::Exercise) => exercise_msg(runner),
        Ok(Advance::Complete(summary)) => ServerWsMessage::LessonComplete { summary },
        Err(e) => lesson_error_msg(e),
      }
    }

    ClientWsMessage::Retry => {
      let Some(runner) = session.runner.as_mut() else { return no_lesson() };
      match runner.retry().await {
        Ok(()) => exercise_msg(runner),
        Err(e) => lesson_error_msg(e),
      }
    }

    ClientWsMessage::Speak { slow } => {
      let Some(req) = session.runner.as_ref().and_then(|r| r.speech_request(slow)) else {
        return ServerWsMessage::AudioUnavailable;
      };
      match speak(state, &req).await {
        Some(audio) => ServerWsMessage::Audio { mime: "audio/mpeg".into(), audio_base64: STANDARD.encode(audio) },
        None => ServerWsMessage::AudioUnavailable,
      }
    }
  }
}
