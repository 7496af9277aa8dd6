//! Minimal Google Cloud Text-to-Speech client.
//!
//! One call: `text:synthesize` with an API key, MP3 output. The response carries
//! base64 audio which we decode to raw bytes. No retries; callers log failures
//! and carry on without audio.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::domain::{Language, VoiceGender};
use crate::error::SpeechError;
use crate::util::trunc_for_log;

const SLOW_SPEAKING_RATE: f32 = 0.7;

#[derive(Clone, Debug, Deserialize)]
pub struct SpeechRequest {
  pub text: String,
  pub language: Language,
  #[serde(default)]
  pub voice: VoiceGender,
  #[serde(default)]
  pub slow: bool,
}

#[derive(Clone)]
pub struct SpeechClient {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
}

impl SpeechClient {
  /// Construct the client if we find GOOGLE_TTS_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GOOGLE_TTS_API_KEY").ok()?;
    let base_url = std::env::var("GOOGLE_TTS_BASE_URL")
      .unwrap_or_else(|_| "https://texttospeech.googleapis.com/v1".into());
    Self::new(&base_url, &api_key)
  }

  pub fn new(base_url: &str, api_key: &str) -> Option<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;
    Some(Self { client, api_key: api_key.to_string(), base_url: base_url.trim_end_matches('/').to_string() })
  }

  /// Synthesize `req.text` and return MP3 bytes.
  #[instrument(level = "info", skip(self, req), fields(lang = req.language.speech_code(), text_len = req.text.len(), slow = req.slow))]
  pub async fn synthesize(&self, req: &SpeechRequest) -> Result<Vec<u8>, SpeechError> {
    if req.text.trim().is_empty() {
      return Err(SpeechError::NoAudio);
    }
    let url = format!("{}/text:synthesize", self.base_url);
    let body = synthesize_body(req);
    let start = std::time::Instant::now();

    let res = self.client.post(&url)
      .query(&[("key", &self.api_key)])
      .header(USER_AGENT, "milim-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&body).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let text = res.text().await.unwrap_or_default();
      let message = extract_google_error(&text).unwrap_or_else(|| trunc_for_log(&text, 200));
      return Err(SpeechError::Status { status, message });
    }

    let out: SynthesizeResponse = res.json().await?;
    let audio = decode_audio(out.audio_content.as_deref())?;
    info!(elapsed = ?start.elapsed(), bytes = audio.len(), "Speech synthesized");
    Ok(audio)
  }
}

fn synthesize_body(req: &SpeechRequest) -> SynthesizeRequest<'_> {
  SynthesizeRequest {
    input: SynthInput { text: &req.text },
    voice: SynthVoice {
      language_code: req.language.speech_code(),
      ssml_gender: match req.voice {
        VoiceGender::Male => "MALE",
        VoiceGender::Female => "FEMALE",
      },
    },
    audio_config: AudioConfig {
      audio_encoding: "MP3",
      speaking_rate: req.slow.then_some(SLOW_SPEAKING_RATE),
    },
  }
}

fn decode_audio(content: Option<&str>) -> Result<Vec<u8>, SpeechError> {
  match content {
    Some(b64) if !b64.is_empty() => Ok(STANDARD.decode(b64)?),
    _ => Err(SpeechError::NoAudio),
  }
}

// --- Request/response DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
  input: SynthInput<'a>,
  voice: SynthVoice,
  audio_config: AudioConfig,
}
#[derive(Serialize)]
struct SynthInput<'a> { text: &'a str }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthVoice { language_code: &'static str, ssml_gender: &'static str }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
  audio_encoding: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  speaking_rate: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
  #[serde(default)] audio_content: Option<String>,
}

fn extract_google_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn req(text: &str, slow: bool) -> SpeechRequest {
    SpeechRequest { text: text.into(), language: Language::He, voice: VoiceGender::Male, slow }
  }

  #[test]
  fn request_body_shape() {
    let r = req("שלום", true);
    let v = serde_json::to_value(synthesize_body(&r)).unwrap();
    assert_eq!(v["input"]["text"], "שלום");
    assert_eq!(v["voice"]["languageCode"], "he-IL");
    assert_eq!(v["voice"]["ssmlGender"], "MALE");
    assert_eq!(v["audioConfig"]["audioEncoding"], "MP3");
    assert!(v["audioConfig"]["speakingRate"].as_f64().unwrap() < 1.0);

    let r = req("hi", false);
    let v = serde_json::to_value(synthesize_body(&r)).unwrap();
    assert!(v["audioConfig"].get("speakingRate").is_none());
  }

  #[test]
  fn decodes_or_reports_missing_audio() {
    assert_eq!(decode_audio(Some("SUQz")).unwrap(), b"ID3".to_vec());
    assert!(matches!(decode_audio(None), Err(SpeechError::NoAudio)));
    assert!(matches!(decode_audio(Some("")), Err(SpeechError::NoAudio)));
    assert!(matches!(decode_audio(Some("@@@")), Err(SpeechError::Decode(_))));
  }

  #[test]
  fn google_error_message_is_extracted() {
    let body = r#"{"error": {"code": 403, "message": "API key not valid"}}"#;
    assert_eq!(extract_google_error(body).as_deref(), Some("API key not valid"));
    assert_eq!(extract_google_error("<html>"), None);
  }

  #[tokio::test]
  async fn blank_text_short_circuits() {
    let client = SpeechClient::new("http://127.0.0.1:9", "k").unwrap();
    assert!(matches!(client.synthesize(&req("  ", false)).await, Err(SpeechError::NoAudio)));
    assert!(matches!(client.synthesize(&req("שלום", false)).await, Err(SpeechError::Request(_))));
  }
}
