//! Interfaces to the external pipeline stages.
//!
//! Each client can fail on its own; a failure is a [`ProviderError`] and the orchestrator
//! picks the degraded path. Concrete HTTP clients live in `vani-voice`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ProviderResult;
use crate::history::HistoryStore;
use crate::session::CallId;

/// Location of a piece of audio: a recording to transcribe or a synthesized answer to play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioRef(String);

impl AudioRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }
}

/// A previously answered question handed to the summarizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// Speech-to-text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn is_available(&self) -> bool;

    async fn transcribe(&self, audio: &AudioRef) -> ProviderResult<String>;
}

/// LLM used for answers, subject classification and summaries.
#[async_trait]
pub trait Generator: Send + Sync {
    fn is_available(&self) -> bool;

    async fn answer(&self, question: &str) -> ProviderResult<String>;

    /// Raw label for `question`; callers normalize it onto `labels`.
    async fn classify(&self, question: &str, labels: &[&str]) -> ProviderResult<String>;

    async fn summarize(&self, subject: &str, history: &[QaPair]) -> ProviderResult<String>;
}

/// Text-to-speech. `Ok(None)` means "let the telephony gateway speak the text itself".
#[async_trait]
pub trait Synthesizer: Send + Sync {
    fn is_available(&self) -> bool;

    async fn synthesize(&self, text: &str, call_id: &CallId) -> ProviderResult<Option<AudioRef>>;
}

/// Provider availability flags for the health surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAvailability {
    pub transcription: bool,
    pub generation: bool,
    pub synthesis: bool,
    pub history: bool,
}

/// Everything the orchestrator talks to.
#[derive(Clone)]
pub struct Providers {
    pub transcriber: Arc<dyn Transcriber>,
    pub generator: Arc<dyn Generator>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub history: Arc<dyn HistoryStore>,
}

impl Providers {
    pub fn availability(&self) -> ProviderAvailability {
        ProviderAvailability {
            transcription: self.transcriber.is_available(),
            generation: self.generator.is_available(),
            synthesis: self.synthesizer.is_available(),
            history: self.history.is_available(),
        }
    }
}
