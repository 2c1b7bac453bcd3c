//! # Vani Core - Call sessions and the live event feed
//!
//! Shared model and engine of the Vidya Vani phone tutor: the per-call orchestrator,
//! the event broadcast bus that dashboards watch, the rolling metrics behind it, and the
//! question history used for subject summaries.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  telephony webhook                                            │
//! │        │                                                      │
//! │        ▼                                                      │
//! │  ┌──────────────┐   per-call queue   ┌──────────────────┐     │
//! │  │ Orchestrator │ ─────────────────► │  SessionActor    │     │
//! │  └──────────────┘                    │ (state machine)  │     │
//! │                                      └────────┬─────────┘     │
//! │         transcribe / answer / classify /      │ events        │
//! │         summarize / synthesize / history      ▼               │
//! │  ┌──────────────┐                    ┌──────────────────┐     │
//! │  │  Providers   │                    │    EventBus      │──► observers
//! │  └──────────────┘                    │ + MetricsAggr.   │     │
//! │                                      └──────────────────┘     │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod history;
pub mod metrics;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod session;
pub mod subjects;

pub use bus::{EventBus, ObserverHandle};
pub use config::{BusConfig, OrchestratorConfig, VaniConfig};
pub use error::{ConfigError, Feature, ProviderError, ProviderResult, StoreError};
pub use event::{CallPhase, Event, EventBody, LogLevel, Stage, StageStatus};
pub use history::{CallerStats, DisabledHistoryStore, HistoryRecord, HistoryStore, SledHistoryStore, SubjectCount};
pub use metrics::{LatencyWindow, MetricsAggregator, MetricsSnapshot};
pub use orchestrator::{Inbound, Orchestrator, Outcome, RecordingKind, Reply};
pub use prompt::{Route, VoiceAction, VoiceResponse};
pub use providers::{AudioRef, Generator, ProviderAvailability, Providers, QaPair, Synthesizer, Transcriber};
pub use session::{CallId, CallState, Language, Session};
