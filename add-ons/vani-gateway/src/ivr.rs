//! Telephony webhooks. Each handler turns one Twilio form post into an orchestrator input and
//! answers with TwiML.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Form;
use serde::Deserialize;
use tracing::{debug, info, warn};
use vani_core::{AudioRef, CallId, RecordingKind, Reply};

use crate::state::AppState;
use crate::twiml::TwiML;

/// Fields Twilio posts on every voice webhook. Only the ones we use.
#[derive(Debug, Default, Deserialize)]
pub struct IvrForm {
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Digits")]
    pub digits: Option<String>,
    #[serde(rename = "RecordingUrl")]
    pub recording_url: Option<String>,
    #[serde(rename = "CallStatus")]
    pub call_status: Option<String>,
}

type IvrResult = Result<TwiML, (StatusCode, &'static str)>;

fn call_id(form: &IvrForm) -> Result<CallId, (StatusCode, &'static str)> {
    match form.call_sid.as_deref().map(str::trim) {
        Some(sid) if !sid.is_empty() => Ok(CallId::new(sid)),
        _ => {
            warn!(target: "vani::gateway", "webhook without CallSid");
            Err((StatusCode::BAD_REQUEST, "missing CallSid"))
        }
    }
}

fn respond(call_id: &CallId, route: &str, reply: Reply) -> TwiML {
    debug!(target: "vani::gateway", call_id = %call_id, route, state = %reply.state, outcome = ?reply.outcome, "webhook handled");
    TwiML(reply.response)
}

fn recording(form: &IvrForm) -> Option<AudioRef> {
    form.recording_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(AudioRef::new)
}

/// POST /ivr/welcome – incoming call, or a redirect back to the main menu.
pub async fn welcome(State(state): State<AppState>, Form(form): Form<IvrForm>) -> IvrResult {
    let id = call_id(&form)?;
    info!(target: "vani::gateway", call_id = %id, from = %form.from, "📞 /ivr/welcome");
    let reply = state.orchestrator.call_accepted(&id, &form.from).await;
    Ok(respond(&id, "welcome", reply))
}

/// POST /ivr/menu – digits pressed.
pub async fn menu(State(state): State<AppState>, Form(form): Form<IvrForm>) -> IvrResult {
    let id = call_id(&form)?;
    let digits = form.digits.clone().unwrap_or_default();
    info!(target: "vani::gateway", call_id = %id, digits = %digits, "🔢 /ivr/menu");
    let reply = state.orchestrator.digit_pressed(&id, &digits, &form.from).await;
    Ok(respond(&id, "menu", reply))
}

/// POST /ivr/question-recorded – question recording is ready.
pub async fn question_recorded(State(state): State<AppState>, Form(form): Form<IvrForm>) -> IvrResult {
    let id = call_id(&form)?;
    info!(target: "vani::gateway", call_id = %id, "🎙️ /ivr/question-recorded");
    let reply = state
        .orchestrator
        .recording_finished(&id, RecordingKind::Question, recording(&form), &form.from)
        .await;
    Ok(respond(&id, "question-recorded", reply))
}

/// POST /ivr/process-summary – subject recording for a summary is ready.
pub async fn process_summary(State(state): State<AppState>, Form(form): Form<IvrForm>) -> IvrResult {
    let id = call_id(&form)?;
    info!(target: "vani::gateway", call_id = %id, "📊 /ivr/process-summary");
    let reply = state
        .orchestrator
        .recording_finished(&id, RecordingKind::Subject, recording(&form), &form.from)
        .await;
    Ok(respond(&id, "process-summary", reply))
}

/// Statuses after which the call is gone.
fn is_terminal(status: &str) -> bool {
    matches!(status, "completed" | "canceled" | "failed" | "busy" | "no-answer")
}

/// POST /ivr/status – call status callback. Terminal statuses release the session.
pub async fn status(State(state): State<AppState>, Form(form): Form<IvrForm>) -> StatusCode {
    let Ok(id) = call_id(&form) else {
        return StatusCode::BAD_REQUEST;
    };
    let status = form.call_status.as_deref().unwrap_or("").trim().to_ascii_lowercase();
    if is_terminal(&status) {
        info!(target: "vani::gateway", call_id = %id, status = %status, "📴 call finished");
        state.orchestrator.call_ended(&id).await;
    } else {
        debug!(target: "vani::gateway", call_id = %id, status = %status, "call status");
    }
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        for s in ["completed", "canceled", "failed", "busy", "no-answer"] {
            assert!(is_terminal(s), "{s}");
        }
        assert!(!is_terminal("ringing"));
        assert!(!is_terminal("in-progress"));
    }
}
