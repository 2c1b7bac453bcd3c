//! **Speech-to-Text (STT)**: fetch a call recording from the telephony gateway and turn it
//! into text for the orchestrator.
//!
//! `OpenAiTranscriber` talks to any OpenAI-compatible `/audio/transcriptions` endpoint.
//! `UnconfiguredTranscriber` stands in when no key is set so the call flow can degrade.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};
use vani_core::config::{env_first, env_opt_string};
use vani_core::{AudioRef, ProviderError, ProviderResult, Transcriber};

use crate::error::{VoiceError, VoiceResult};

const DEFAULT_STT_URL: &str = "https://api.openai.com/v1";
const DEFAULT_STT_MODEL: &str = "whisper-1";

/// Basic-auth credentials for downloading recordings from the telephony provider.
#[derive(Debug, Clone)]
pub struct RecordingAuth {
    pub account_sid: String,
    pub auth_token: String,
}

impl RecordingAuth {
    /// `TWILIO_ACCOUNT_SID` + `TWILIO_AUTH_TOKEN`, if both are set.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            account_sid: env_opt_string("TWILIO_ACCOUNT_SID")?,
            auth_token: env_opt_string("TWILIO_AUTH_TOKEN")?,
        })
    }
}

/// Production STT backend: OpenAI-compatible transcription API (OpenAI Whisper, Groq, etc.).
/// Uses `STT_API_URL` (e.g. https://api.openai.com/v1), `STT_API_KEY`, and `STT_MODEL` (default whisper-1).
#[derive(Debug, Clone)]
pub struct OpenAiTranscriber {
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Bearer API key.
    pub api_key: String,
    /// Model: whisper-1 or gpt-4o-transcribe, etc.
    pub model: String,
    recording_auth: Option<RecordingAuth>,
    client: reqwest::Client,
}

impl OpenAiTranscriber {
    /// Build from environment: STT_API_URL, STT_API_KEY (or LLM_API_KEY / OPENROUTER_API_KEY), STT_MODEL.
    pub fn from_env() -> VoiceResult<Self> {
        let base_url = env_opt_string("STT_API_URL").unwrap_or_else(|| DEFAULT_STT_URL.to_string());
        let api_key = env_first(&["STT_API_KEY", "LLM_API_KEY", "OPENROUTER_API_KEY"]).ok_or_else(|| {
            VoiceError::Config("STT requires STT_API_KEY, LLM_API_KEY, or OPENROUTER_API_KEY".to_string())
        })?;
        let model = env_opt_string("STT_MODEL").unwrap_or_else(|| DEFAULT_STT_MODEL.to_string());
        Ok(Self::new(base_url, api_key, model)?.with_recording_auth(RecordingAuth::from_env()))
    }

    /// Create with explicit config.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            recording_auth: None,
            client,
        })
    }

    pub fn with_recording_auth(mut self, auth: Option<RecordingAuth>) -> Self {
        self.recording_auth = auth;
        self
    }

    async fn download(&self, audio: &AudioRef) -> VoiceResult<Vec<u8>> {
        let mut req = self.client.get(audio.url());
        if let Some(auth) = &self.recording_auth {
            req = req.basic_auth(&auth.account_sid, Some(&auth.auth_token));
        }
        let res = req.send().await.map_err(|e| VoiceError::Download(e.to_string()))?;
        if !res.status().is_success() {
            return Err(VoiceError::Download(format!("recording fetch returned {}", res.status())));
        }
        let bytes = res.bytes().await.map_err(|e| VoiceError::Download(e.to_string()))?;
        debug!(target: "vani::voice", bytes = bytes.len(), "📥 recording downloaded");
        Ok(bytes.to_vec())
    }

    async fn transcribe_bytes(&self, audio: Vec<u8>) -> VoiceResult<String> {
        if audio.is_empty() {
            return Ok(String::new());
        }
        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        let part = reqwest::multipart::Part::bytes(audio)
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Stt(format!("STT API error {}: {}", status, body)));
        }
        let json: serde_json::Value = res.json().await.map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(transcript_text(&json))
    }
}

/// Pull the `text` field out of a transcription response.
pub(crate) fn transcript_text(json: &serde_json::Value) -> String {
    json.get("text")
        .and_then(|t| t.as_str())
        .unwrap_or("")
        .trim()
        .to_string()
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    fn is_available(&self) -> bool {
        true
    }

    async fn transcribe(&self, audio: &AudioRef) -> ProviderResult<String> {
        let bytes = self.download(audio).await?;
        let text = self.transcribe_bytes(bytes).await?;
        info!(target: "vani::voice", chars = text.len(), "📝 transcription received");
        Ok(text)
    }
}

/// Stand-in when no STT key is configured. Never available.
#[derive(Debug, Default)]
pub struct UnconfiguredTranscriber;

#[async_trait]
impl Transcriber for UnconfiguredTranscriber {
    fn is_available(&self) -> bool {
        false
    }

    async fn transcribe(&self, _audio: &AudioRef) -> ProviderResult<String> {
        Err(ProviderError::TranscriptionUnavailable("STT_API_KEY not set".to_string()))
    }
}

/// Pick the best transcriber the environment allows.
pub fn create_best_transcriber() -> Box<dyn Transcriber> {
    match OpenAiTranscriber::from_env() {
        Ok(t) => Box::new(t),
        Err(e) => {
            debug!(target: "vani::voice", error = %e, "transcription not configured");
            Box::new(UnconfiguredTranscriber)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_text_is_trimmed() {
        let json = serde_json::json!({ "text": "  what is gravity \n" });
        assert_eq!(transcript_text(&json), "what is gravity");
        assert_eq!(transcript_text(&serde_json::json!({ "error": "x" })), "");
    }

    #[tokio::test]
    async fn unconfigured_reports_transcription_unavailable() {
        let t = UnconfiguredTranscriber;
        assert!(!t.is_available());
        let err = t.transcribe(&AudioRef::new("http://x/rec")).await.unwrap_err();
        assert_eq!(err.feature(), vani_core::Feature::Transcription);
    }

    #[tokio::test]
    async fn empty_recording_skips_the_api() {
        let t = OpenAiTranscriber::new("http://127.0.0.1:9", "key", "whisper-1").unwrap();
        assert_eq!(t.transcribe_bytes(Vec::new()).await.unwrap(), "");
    }
}
