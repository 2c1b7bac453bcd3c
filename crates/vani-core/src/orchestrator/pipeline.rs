//! Bounded pipeline stage calls and the detached question persistence.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::bus::EventBus;
use crate::error::{ProviderError, ProviderResult};
use crate::event::{EventBody, LogLevel, Stage, StageStatus};
use crate::history::HistoryStore;
use crate::providers::{AudioRef, Generator, Synthesizer};
use crate::session::CallId;
use crate::subjects::{normalize_label, CANONICAL_SUBJECTS, FALLBACK_SUBJECT};

/// Run one stage with a hard deadline, publishing processing → complete | error.
pub(crate) async fn timed_stage<T, F>(
    bus: &EventBus,
    call_id: &CallId,
    stage: Stage,
    limit: Duration,
    fut: F,
) -> ProviderResult<T>
where
    F: Future<Output = ProviderResult<T>>,
{
    bus.publish(EventBody::stage(call_id, stage, StageStatus::Processing));
    let started = Instant::now();
    let result = match tokio::time::timeout(limit, fut).await {
        Ok(r) => r,
        Err(_) => Err(ProviderError::Timeout {
            stage,
            after_ms: limit.as_millis() as u64,
        }),
    };
    let elapsed = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => {
            bus.publish(EventBody::PipelineStageUpdate {
                call_id: call_id.clone(),
                stage,
                status: StageStatus::Complete,
                state: None,
                duration_ms: Some(elapsed),
                detail: None,
            });
        }
        Err(e) => {
            warn!(target: "vani::orchestrator", call_id = %call_id, %stage, error = %e, "stage failed");
            bus.publish(EventBody::PipelineStageUpdate {
                call_id: call_id.clone(),
                stage,
                status: StageStatus::Error,
                state: None,
                duration_ms: Some(elapsed),
                detail: Some(e.to_string()),
            });
            bus.publish(EventBody::call_log(
                LogLevel::Error,
                call_id,
                format!("{stage} failed: {e}"),
            ));
        }
    }
    result
}

/// Synthesize `text`; any failure or absent audio means the gateway voice speaks it instead.
pub(crate) async fn synthesize_or_fallback(
    bus: &EventBus,
    synthesizer: &Arc<dyn Synthesizer>,
    call_id: &CallId,
    text: &str,
    limit: Duration,
) -> Option<AudioRef> {
    if !synthesizer.is_available() {
        return None;
    }
    let result = timed_stage(
        bus,
        call_id,
        Stage::SpeechSynthesis,
        limit,
        synthesizer.synthesize(text, call_id),
    )
    .await;
    match result {
        Ok(audio) => audio,
        Err(_) => {
            bus.publish(EventBody::call_log(
                LogLevel::Warning,
                call_id,
                "speech synthesis failed; using the gateway voice",
            ));
            None
        }
    }
}

/// Inputs for the fire-and-forget history write after an answer.
pub(crate) struct Persist {
    pub bus: EventBus,
    pub generator: Arc<dyn Generator>,
    pub history: Arc<dyn HistoryStore>,
    pub call_id: CallId,
    pub caller: String,
    pub question: String,
    pub answer: String,
    pub limit: Duration,
}

/// Classify and append on a detached task. Failures are reported on the bus and otherwise
/// ignored; the call never waits for this.
pub(crate) fn spawn_persist(p: Persist) {
    if !p.history.is_available() {
        p.bus.publish(EventBody::call_log(
            LogLevel::Warning,
            &p.call_id,
            "history store unavailable; question not saved",
        ));
        return;
    }
    tokio::spawn(async move {
        let raw = if p.generator.is_available() {
            tokio::time::timeout(p.limit, p.generator.classify(&p.question, CANONICAL_SUBJECTS))
                .await
                .unwrap_or(Err(ProviderError::Timeout {
                    stage: Stage::AnswerGeneration,
                    after_ms: p.limit.as_millis() as u64,
                }))
        } else {
            Err(ProviderError::GenerationUnavailable("not configured".to_string()))
        };
        let subject = match raw {
            Ok(label) => normalize_label(&label),
            Err(e) => {
                warn!(target: "vani::orchestrator", call_id = %p.call_id, error = %e, "classification failed; using fallback subject");
                FALLBACK_SUBJECT.to_string()
            }
        };

        let appended = tokio::time::timeout(
            p.limit,
            p.history.append(&p.caller, &subject, &p.question, &p.answer),
        )
        .await;
        match appended {
            Ok(Ok(_)) => {
                info!(target: "vani::orchestrator", call_id = %p.call_id, subject = %subject, "✅ question saved");
                p.bus.publish(EventBody::call_log(
                    LogLevel::Success,
                    &p.call_id,
                    format!("Saved question under {subject}"),
                ));
            }
            Ok(Err(e)) => {
                warn!(target: "vani::orchestrator", call_id = %p.call_id, error = %e, "history append failed");
                p.bus.publish(EventBody::call_log(
                    LogLevel::Error,
                    &p.call_id,
                    format!("Could not save question: {e}"),
                ));
            }
            Err(_) => {
                p.bus.publish(EventBody::call_log(
                    LogLevel::Error,
                    &p.call_id,
                    "Could not save question: history store timed out",
                ));
            }
        }
    });
}
