//! Milim · Hebrew/English Word-Bank Trainer Backend
//!
//! - Axum HTTP + WebSocket API (one lesson session per socket)
//! - Content from a PostgREST service when configured, else a local bank
//! - Optional Google Text-to-Speech for prompt audio
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   SUPABASE_URL        : PostgREST base URL; with SUPABASE_ANON_KEY enables the remote data source
//!   SUPABASE_ANON_KEY   : API key sent as `apikey` and bearer token
//!   GOOGLE_TTS_API_KEY  : enables speech synthesis if present
//!   GOOGLE_TTS_BASE_URL : default "https://texttospeech.googleapis.com/v1"
//!   APP_CONFIG_PATH     : path to TOML config (lesson settings + optional content bank)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod seeds;
mod shuffle;
mod words;
mod distractors;
mod sequencer;
mod matcher;
mod error;
mod backend;
mod speech;
mod lesson;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Data source, curriculum cache, speech client, lesson settings.
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "milim_backend", %addr, source = state.data.kind(), "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "milim_backend", error = %e, "Failed to listen for shutdown signal");
  }
  info!(target: "milim_backend", "Shutting down");
}
