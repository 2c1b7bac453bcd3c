//! Error types for the Vani voice clients

use thiserror::Error;
use vani_core::ProviderError;

/// Result type alias for voice client operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors raised by the HTTP stage clients before they reach the orchestrator
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Recording download error: {0}")]
    Download(String),

    #[error("STT error: {0}")]
    Stt(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<VoiceError> for ProviderError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::Download(_) | VoiceError::Stt(_) => {
                ProviderError::TranscriptionUnavailable(err.to_string())
            }
            VoiceError::Llm(_) => ProviderError::GenerationUnavailable(err.to_string()),
            VoiceError::Tts(_) | VoiceError::Io(_) => {
                ProviderError::SynthesisUnavailable(err.to_string())
            }
            // Only raised by constructors; clients that exist are configured.
            VoiceError::Config(_) => ProviderError::GenerationUnavailable(err.to_string()),
        }
    }
}
