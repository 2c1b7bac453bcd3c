//! **Text-to-Speech (TTS)**: synthesize answers into mp3 files the telephony gateway can
//! play back from `/audio/<file>`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use vani_core::config::{env_first, env_opt_string};
use vani_core::{AudioRef, CallId, ProviderResult, Synthesizer};

use crate::error::{VoiceError, VoiceResult};

const DEFAULT_TTS_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TTS_MODEL: &str = "tts-1";
const DEFAULT_TTS_VOICE: &str = "nova";

/// Where synthesized files go and how they are served.
#[derive(Debug, Clone)]
pub struct AudioStore {
    pub dir: PathBuf,
    /// Base URL the gateway is reachable at, e.g. `https://tutor.example.com`.
    pub public_base_url: String,
    /// Files older than this are pruned after each synthesis.
    pub retention: Duration,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: impl Into<String>, retention: Duration) -> Self {
        Self {
            dir: dir.into(),
            public_base_url: public_base_url.into(),
            retention,
        }
    }

    /// `answer_<call>_<millis>.mp3`
    pub fn file_name(call_id: &CallId) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let safe: String = call_id
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        format!("answer_{safe}_{millis}.mp3")
    }

    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}/audio/{}", self.public_base_url.trim_end_matches('/'), file_name)
    }

    /// Write `bytes` for `call_id` and return the public reference.
    pub async fn save(&self, call_id: &CallId, bytes: &[u8]) -> VoiceResult<AudioRef> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let name = Self::file_name(call_id);
        tokio::fs::write(self.dir.join(&name), bytes).await?;
        debug!(target: "vani::voice", file = %name, bytes = bytes.len(), "audio written");
        Ok(AudioRef::new(self.url_for(&name)))
    }

    /// Delete files whose modification time is older than the retention window.
    /// Returns how many were removed.
    pub async fn prune(&self) -> VoiceResult<usize> {
        prune_older_than(&self.dir, self.retention, SystemTime::now()).await
    }
}

pub(crate) async fn prune_older_than(dir: &Path, retention: Duration, now: SystemTime) -> VoiceResult<usize> {
    let mut removed = 0;
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age > retention {
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }
    if removed > 0 {
        info!(target: "vani::voice", removed, "🧹 pruned old audio files");
    }
    Ok(removed)
}

/// Production TTS backend: OpenAI-compatible `/audio/speech`.
/// Uses `TTS_API_URL`, `TTS_API_KEY` (or `LLM_API_KEY` / `OPENROUTER_API_KEY`), `TTS_MODEL`, `TTS_VOICE`.
#[derive(Debug, Clone)]
pub struct OpenAiSynthesizer {
    pub base_url: String,
    pub api_key: String,
    /// tts-1 (fast) or tts-1-hd.
    pub model: String,
    pub voice: String,
    store: AudioStore,
    client: reqwest::Client,
}

impl OpenAiSynthesizer {
    pub fn from_env(store: AudioStore) -> VoiceResult<Self> {
        let base_url = env_opt_string("TTS_API_URL").unwrap_or_else(|| DEFAULT_TTS_URL.to_string());
        let api_key = env_first(&["TTS_API_KEY", "LLM_API_KEY", "OPENROUTER_API_KEY"]).ok_or_else(|| {
            VoiceError::Config("TTS requires TTS_API_KEY, LLM_API_KEY, or OPENROUTER_API_KEY".to_string())
        })?;
        let model = env_opt_string("TTS_MODEL").unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string());
        let synth = Self::new(base_url, api_key, model, store)?;
        Ok(match env_opt_string("TTS_VOICE") {
            Some(v) => synth.with_voice(v),
            None => synth,
        })
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        store: AudioStore,
    ) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            voice: DEFAULT_TTS_VOICE.to_string(),
            store,
            client,
        })
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    async fn speech_bytes(&self, text: &str) -> VoiceResult<Vec<u8>> {
        let url = format!("{}/audio/speech", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
            "response_format": "mp3",
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Tts(format!("TTS API error {}: {}", status, body)));
        }
        let bytes = res.bytes().await.map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Synthesizer for OpenAiSynthesizer {
    fn is_available(&self) -> bool {
        true
    }

    async fn synthesize(&self, text: &str, call_id: &CallId) -> ProviderResult<Option<AudioRef>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let bytes = self.speech_bytes(text).await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let audio = self.store.save(call_id, &bytes).await?;
        if let Err(e) = self.store.prune().await {
            warn!(target: "vani::voice", error = %e, "audio cleanup failed");
        }
        Ok(Some(audio))
    }
}

/// Stand-in when no TTS key is configured: the gateway voice always speaks.
#[derive(Debug, Default)]
pub struct UnconfiguredSynthesizer;

#[async_trait]
impl Synthesizer for UnconfiguredSynthesizer {
    fn is_available(&self) -> bool {
        false
    }

    async fn synthesize(&self, _text: &str, _call_id: &CallId) -> ProviderResult<Option<AudioRef>> {
        Ok(None)
    }
}

/// Pick the best synthesizer the environment allows.
pub fn create_best_synthesizer(store: AudioStore) -> Box<dyn Synthesizer> {
    match OpenAiSynthesizer::from_env(store) {
        Ok(s) => Box::new(s),
        Err(e) => {
            debug!(target: "vani::voice", error = %e, "synthesis not configured; gateway voice only");
            Box::new(UnconfiguredSynthesizer)
        }
    }
}
