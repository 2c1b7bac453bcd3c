//! Typed events carried by the bus.
//!
//! Wire format is a flat JSON object: `seq`, `timestamp`, a `kind` discriminator and the
//! kind-specific payload in camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Feature;
use crate::metrics::MetricsSnapshot;
use crate::session::{CallId, CallState};

/// Pipeline stage a `pipelineStageUpdate` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Intake,
    Transcription,
    Retrieval,
    AnswerGeneration,
    SpeechSynthesis,
    Delivery,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Intake => "intake",
            Stage::Transcription => "transcription",
            Stage::Retrieval => "retrieval",
            Stage::AnswerGeneration => "answerGeneration",
            Stage::SpeechSynthesis => "speechSynthesis",
            Stage::Delivery => "delivery",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageStatus {
    Active,
    Processing,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallPhase {
    Started,
    Ended,
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EventBody {
    #[serde(rename_all = "camelCase")]
    Log {
        level: LogLevel,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<CallId>,
        #[serde(default)]
        live: bool,
    },
    #[serde(rename_all = "camelCase")]
    PipelineStageUpdate {
        call_id: CallId,
        stage: Stage,
        status: StageStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<CallState>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    MetricsSnapshot(MetricsSnapshot),
    #[serde(rename_all = "camelCase")]
    NetworkCallRecord {
        method: String,
        endpoint: String,
        status: u16,
        latency_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    CallLifecycle {
        call_id: CallId,
        phase: CallPhase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caller: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    FeatureStatus {
        feature: Feature,
        available: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl EventBody {
    pub fn kind(&self) -> &'static str {
        match self {
            EventBody::Log { .. } => "log",
            EventBody::PipelineStageUpdate { .. } => "pipelineStageUpdate",
            EventBody::MetricsSnapshot(_) => "metricsSnapshot",
            EventBody::NetworkCallRecord { .. } => "networkCallRecord",
            EventBody::CallLifecycle { .. } => "callLifecycle",
            EventBody::FeatureStatus { .. } => "featureStatus",
        }
    }

    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        EventBody::Log { level, message: message.into(), call_id: None, live: false }
    }

    pub fn call_log(level: LogLevel, call_id: &CallId, message: impl Into<String>) -> Self {
        EventBody::Log {
            level,
            message: message.into(),
            call_id: Some(call_id.clone()),
            live: false,
        }
    }

    pub fn stage(call_id: &CallId, stage: Stage, status: StageStatus) -> Self {
        EventBody::PipelineStageUpdate {
            call_id: call_id.clone(),
            stage,
            status,
            state: None,
            duration_ms: None,
            detail: None,
        }
    }

    /// Events an observer should render without waiting for its flush interval.
    pub fn is_urgent(&self) -> bool {
        match self {
            EventBody::Log { level, live, .. } => {
                *live || matches!(level, LogLevel::Error | LogLevel::Success)
            }
            EventBody::PipelineStageUpdate { status, .. } => *status == StageStatus::Error,
            EventBody::FeatureStatus { available, .. } => !available,
            _ => false,
        }
    }
}

/// An immutable record published on the bus. `seq` is the global publication order;
/// `seq == 0` marks a per-observer snapshot that is not part of that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub body: EventBody,
}

impl Event {
    pub fn is_snapshot(&self) -> bool {
        self.seq == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_update_wire_shape() {
        let ev = Event {
            seq: 7,
            timestamp: Utc::now(),
            body: EventBody::PipelineStageUpdate {
                call_id: CallId::new("C1"),
                stage: Stage::AnswerGeneration,
                status: StageStatus::Complete,
                state: Some(CallState::Speaking),
                duration_ms: Some(420),
                detail: None,
            },
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["kind"], "pipelineStageUpdate");
        assert_eq!(v["seq"], 7);
        assert_eq!(v["callId"], "C1");
        assert_eq!(v["stage"], "answerGeneration");
        assert_eq!(v["status"], "complete");
        assert_eq!(v["state"], "speaking");
        assert_eq!(v["durationMs"], 420);
        assert!(v.get("detail").is_none());

        let back: Event = serde_json::from_value(v).unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn urgency_rules() {
        assert!(EventBody::log(LogLevel::Error, "boom").is_urgent());
        assert!(EventBody::log(LogLevel::Success, "done").is_urgent());
        assert!(!EventBody::log(LogLevel::Info, "hello").is_urgent());
        let live = EventBody::Log { level: LogLevel::Info, message: "x".into(), call_id: None, live: true };
        assert!(live.is_urgent());
        let c = CallId::new("C1");
        assert!(EventBody::stage(&c, Stage::Transcription, StageStatus::Error).is_urgent());
        assert!(!EventBody::stage(&c, Stage::Transcription, StageStatus::Complete).is_urgent());
    }

    #[test]
    fn log_without_call_id_parses() {
        let raw = r#"{"seq":3,"timestamp":"2024-01-01T00:00:00Z","kind":"log","level":"warning","message":"slow"}"#;
        let ev: Event = serde_json::from_str(raw).unwrap();
        assert_eq!(ev.body, EventBody::log(LogLevel::Warning, "slow"));
    }
}
