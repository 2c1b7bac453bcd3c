//! Error types shared across the tutoring line.

use thiserror::Error;

use crate::event::Stage;

/// Result alias for pipeline stage calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// A pipeline stage could not deliver. Always recovered by the orchestrator with a degraded path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transcription unavailable: {0}")]
    TranscriptionUnavailable(String),

    #[error("generation unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("speech synthesis unavailable: {0}")]
    SynthesisUnavailable(String),

    #[error("history store unavailable: {0}")]
    HistoryUnavailable(String),

    #[error("{stage} timed out after {after_ms}ms")]
    Timeout { stage: Stage, after_ms: u64 },
}

impl ProviderError {
    /// The caller-facing feature that a failure disables.
    pub fn feature(&self) -> Feature {
        match self {
            ProviderError::TranscriptionUnavailable(_) => Feature::Transcription,
            ProviderError::GenerationUnavailable(_) => Feature::Generation,
            ProviderError::SynthesisUnavailable(_) => Feature::Synthesis,
            ProviderError::HistoryUnavailable(_) => Feature::History,
            ProviderError::Timeout { stage, .. } => match stage {
                Stage::Transcription | Stage::Intake => Feature::Transcription,
                Stage::Retrieval => Feature::History,
                Stage::AnswerGeneration => Feature::Generation,
                Stage::SpeechSynthesis | Stage::Delivery => Feature::Synthesis,
            },
        }
    }
}

/// External capability the orchestrator depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    Transcription,
    Generation,
    Synthesis,
    History,
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Feature::Transcription => "transcription",
            Feature::Generation => "generation",
            Feature::Synthesis => "synthesis",
            Feature::History => "history",
        };
        f.write_str(s)
    }
}

/// Errors from the question history store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("history store is not configured")]
    Unavailable,

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("record codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<StoreError> for ProviderError {
    fn from(err: StoreError) -> Self {
        ProviderError::HistoryUnavailable(err.to_string())
    }
}

/// Configuration loading failed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Load(#[from] config::ConfigError),
}
