//! # Vani Voice - Pipeline stage clients
//!
//! HTTP clients behind the provider traits of `vani-core`, plus unconfigured stand-ins
//! so a missing key disables one feature instead of the whole line.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     build_providers()                       │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐       │
//! │  │     STT      │  │     LLM      │  │     TTS      │       │
//! │  │ /audio/trans │  │ /chat/compl. │  │ /audio/speech│       │
//! │  └──────────────┘  └──────────────┘  └──────┬───────┘       │
//! │         ↑ recording (basic auth)            ↓ mp3           │
//! │   telephony gateway                  AudioStore (/audio/*)  │
//! │                                                             │
//! │  ┌──────────────┐                                           │
//! │  │   History    │  sled at <storage>/vani_history           │
//! │  └──────────────┘                                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod llm;
pub mod stt;
pub mod tts;

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use vani_core::{DisabledHistoryStore, HistoryStore, Providers, SledHistoryStore, VaniConfig};

pub use error::{VoiceError, VoiceResult};
pub use llm::{create_best_generator, OpenRouterGenerator, UnconfiguredGenerator};
pub use stt::{create_best_transcriber, OpenAiTranscriber, RecordingAuth, UnconfiguredTranscriber};
pub use tts::{create_best_synthesizer, AudioStore, OpenAiSynthesizer, UnconfiguredSynthesizer};

/// Audio store described by the configuration.
pub fn audio_store(config: &VaniConfig) -> AudioStore {
    AudioStore::new(
        &config.audio_dir,
        &config.public_base_url,
        Duration::from_secs(config.audio_retention_secs),
    )
}

/// Open the question history; an unopenable store disables summaries instead of failing startup.
pub fn open_history(config: &VaniConfig) -> Arc<dyn HistoryStore> {
    let path = config.history_path();
    match SledHistoryStore::open(&path) {
        Ok(store) => {
            info!(target: "vani::voice", path = %path.display(), "📚 history store opened");
            Arc::new(store)
        }
        Err(e) => {
            warn!(target: "vani::voice", path = %path.display(), error = %e, "history store unavailable; summaries disabled");
            Arc::new(DisabledHistoryStore)
        }
    }
}

/// Assemble every provider from the environment and configuration.
pub fn build_providers(config: &VaniConfig) -> Providers {
    let providers = Providers {
        transcriber: Arc::from(create_best_transcriber()),
        generator: Arc::from(create_best_generator()),
        synthesizer: Arc::from(create_best_synthesizer(audio_store(config))),
        history: open_history(config),
    };
    let a = providers.availability();
    info!(
        target: "vani::voice",
        transcription = a.transcription,
        generation = a.generation,
        synthesis = a.synthesis,
        history = a.history,
        "🔌 providers ready"
    );
    providers
}
