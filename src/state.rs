//! Application state: data source, curriculum cache, speech client, and lesson settings.
//!
//! This module owns:
//!   - the data source (remote PostgREST API when configured, otherwise the local bank)
//!   - a read-mostly curriculum cache
//!   - the optional speech client
//!   - lesson settings (from TOML or defaults)
//!
//! Per-learner lesson state is NOT here: each WebSocket session owns its own runner.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::backend::{DataSource, LocalStore, RestBackend};
use crate::config::{load_app_config_from_env, LessonSettings};
use crate::domain::Unit;
use crate::error::DataError;
use crate::lesson::LessonContext;
use crate::speech::SpeechClient;

#[derive(Clone)]
pub struct AppState {
    pub data: DataSource,
    pub curriculum: Arc<RwLock<Option<Vec<Unit>>>>,
    pub speech: Option<SpeechClient>,
    pub settings: LessonSettings,
}

impl AppState {
    /// Build state from env: load config, pick the data source, init the speech client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_app_config_from_env();
        let settings = cfg.as_ref().map(|c| c.lesson.clone()).unwrap_or_default();

        let data = match RestBackend::from_env() {
            Some(rest) => {
                info!(target: "milim_backend", base_url = %rest.base_url, "Remote data service enabled.");
                DataSource::Rest(rest)
            }
            None => {
                info!(target: "milim_backend", "No SUPABASE_URL/SUPABASE_ANON_KEY. Using local content bank.");
                DataSource::Local(LocalStore::from_config(cfg.as_ref()))
            }
        };

        let speech = SpeechClient::from_env();
        if let Some(s) = &speech {
            info!(target: "milim_backend", base_url = %s.base_url, "Speech synthesis enabled.");
        } else {
            info!(target: "milim_backend", "Speech synthesis disabled (no GOOGLE_TTS_API_KEY).");
        }

        Self::with_parts(data, speech, settings)
    }

    pub fn with_parts(data: DataSource, speech: Option<SpeechClient>, settings: LessonSettings) -> Self {
        Self { data, curriculum: Arc::new(RwLock::new(None)), speech, settings }
    }

    /// Curriculum from cache, fetched once on first use. Failures are not cached.
    #[instrument(level = "debug", skip(self))]
    pub async fn curriculum(&self) -> Result<Vec<Unit>, DataError> {
        if let Some(units) = self.curriculum.read().await.as_ref() {
            return Ok(units.clone());
        }
        let units = self.data.fetch_curriculum().await?;
        info!(target: "lesson", units = units.len(), "Curriculum loaded");
        *self.curriculum.write().await = Some(units.clone());
        Ok(units)
    }

    /// Context handed to a new lesson runner.
    pub fn lesson_context(&self) -> LessonContext {
        LessonContext { data: self.data.clone(), settings: self.settings.clone() }
    }
}
