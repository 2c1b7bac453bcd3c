use super::*;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use futures_util::StreamExt;
use std::sync::Arc;
use tower::ServiceExt;
use vani_core::{
    AudioRef, EventBody, Generator, ProviderResult, Providers, QaPair, SledHistoryStore, Transcriber,
};
use vani_voice::{UnconfiguredGenerator, UnconfiguredSynthesizer, UnconfiguredTranscriber};

struct EchoTranscriber;

#[async_trait]
impl Transcriber for EchoTranscriber {
    fn is_available(&self) -> bool {
        true
    }

    async fn transcribe(&self, audio: &AudioRef) -> ProviderResult<String> {
        Ok(audio.url().trim_start_matches("say:").to_string())
    }
}

struct CannedGenerator;

#[async_trait]
impl Generator for CannedGenerator {
    fn is_available(&self) -> bool {
        true
    }

    async fn answer(&self, question: &str) -> ProviderResult<String> {
        Ok(format!("Here is why: {question}"))
    }

    async fn classify(&self, _question: &str, _labels: &[&str]) -> ProviderResult<String> {
        Ok("Physics".to_string())
    }

    async fn summarize(&self, subject: &str, history: &[QaPair]) -> ProviderResult<String> {
        Ok(format!("{} {subject} questions so far", history.len()))
    }
}

fn test_config(dir: &std::path::Path) -> VaniConfig {
    VaniConfig {
        audio_dir: dir.display().to_string(),
        stage_timeout_secs: 2,
        ..VaniConfig::default()
    }
}

fn app_with(providers: Providers, dir: &std::path::Path) -> (Router, AppState) {
    let config = test_config(dir);
    let bus = EventBus::new(config.bus());
    let orchestrator = Orchestrator::new(bus, providers, config.orchestrator());
    let state = AppState::new(config, orchestrator);
    (build_app(state.clone()), state)
}

fn working_providers() -> Providers {
    Providers {
        transcriber: Arc::new(EchoTranscriber),
        generator: Arc::new(CannedGenerator),
        synthesizer: Arc::new(UnconfiguredSynthesizer),
        history: Arc::new(SledHistoryStore::temporary().unwrap()),
    }
}

fn unconfigured_providers() -> Providers {
    Providers {
        transcriber: Arc::new(UnconfiguredTranscriber),
        generator: Arc::new(UnconfiguredGenerator),
        synthesizer: Arc::new(UnconfiguredSynthesizer),
        history: Arc::new(vani_core::DisabledHistoryStore),
    }
}

async fn post_form(app: &Router, path: &str, form: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get_json(app: &Router, path: &str) -> serde_json::Value {
    let req = Request::builder().uri(path).body(Body::empty()).unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK, "{path}");
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn welcome_answers_with_language_menu() {
    let dir = tempfile::tempdir().unwrap();
    let (app, state) = app_with(working_providers(), dir.path());

    let req = Request::builder()
        .method("POST")
        .uri("/ivr/welcome")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("CallSid=CA1&From=%2B15550100"))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/xml");
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let xml = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(xml.contains("For English, press 1"));
    assert!(xml.contains("action=\"/ivr/menu\""));

    let recorded = state.bus.recent(100).into_iter().any(|e| matches!(
        e.body,
        EventBody::NetworkCallRecord { ref endpoint, status: 200, .. } if endpoint == "/ivr/welcome"
    ));
    assert!(recorded);
}

#[tokio::test]
async fn menu_digits_drive_the_call() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app_with(working_providers(), dir.path());
    post_form(&app, "/ivr/welcome", "CallSid=CA2&From=%2B1").await;

    let (_, xml) = post_form(&app, "/ivr/menu", "CallSid=CA2&From=%2B1&Digits=1").await;
    assert!(xml.contains("Press 1 to ask a question"));

    let (_, xml) = post_form(&app, "/ivr/menu", "CallSid=CA2&From=%2B1&Digits=7").await;
    assert!(xml.contains("not a valid option"));

    let (_, xml) = post_form(&app, "/ivr/menu", "CallSid=CA2&From=%2B1&Digits=9").await;
    assert!(xml.contains("Goodbye"));
    assert!(xml.contains("<Hangup/>"));
}

#[tokio::test]
async fn question_is_answered_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let (app, state) = app_with(working_providers(), dir.path());
    post_form(&app, "/ivr/welcome", "CallSid=CA3&From=%2B1").await;
    post_form(&app, "/ivr/menu", "CallSid=CA3&From=%2B1&Digits=1").await;

    let (_, xml) = post_form(&app, "/ivr/menu", "CallSid=CA3&From=%2B1&Digits=1").await;
    assert!(xml.contains("<Record maxLength=\"60\" finishOnKey=\"2\" action=\"/ivr/question-recorded\""));

    post_form(&app, "/ivr/menu", "CallSid=CA3&From=%2B1&Digits=2").await;
    let (status, _) = post_form(
        &app,
        "/ivr/question-recorded",
        "CallSid=CA3&From=%2B1&RecordingUrl=say%3Awhat%20is%20light",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let id = vani_core::CallId::new("CA3");
    for _ in 0..200 {
        let s = state.orchestrator.session(&id).await.unwrap();
        if s.pending_question_text.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let (_, xml) = post_form(&app, "/ivr/menu", "CallSid=CA3&From=%2B1&Digits=3").await;
    assert!(xml.contains("Here is why: what is light"));

    let calls = get_json(&app, "/api/v1/calls").await;
    assert_eq!(calls[0]["id"], "CA3");
    assert_eq!(calls[0]["state"], "menu");
}

#[tokio::test]
async fn missing_call_sid_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app_with(working_providers(), dir.path());
    let (status, _) = post_form(&app, "/ivr/menu", "Digits=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completed_status_releases_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let (app, state) = app_with(working_providers(), dir.path());
    post_form(&app, "/ivr/welcome", "CallSid=CA4&From=%2B1").await;
    assert_eq!(get_json(&app, "/api/v1/calls").await.as_array().unwrap().len(), 1);

    let (status, _) = post_form(&app, "/ivr/status", "CallSid=CA4&CallStatus=ringing").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(state.orchestrator.active_calls(), 1);

    let (status, _) = post_form(&app, "/ivr/status", "CallSid=CA4&CallStatus=completed").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(state.orchestrator.active_calls(), 0);
    assert!(get_json(&app, "/api/v1/calls").await.as_array().unwrap().is_empty());
    assert_eq!(get_json(&app, "/api/v1/metrics").await["activeSessions"], 0);
}

#[tokio::test]
async fn health_reports_degraded_services() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app_with(unconfigured_providers(), dir.path());
    post_form(&app, "/ivr/welcome", "CallSid=CA5&From=%2B1").await;

    let health = get_json(&app, "/health").await;
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["services"]["transcription"], false);
    assert_eq!(health["services"]["history"], false);
    assert_eq!(health["metrics"]["totalCalls"], 1);
    assert!(health["timestamp"].is_string());
}

#[tokio::test]
async fn unconfigured_transcription_apologizes() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app_with(unconfigured_providers(), dir.path());
    post_form(&app, "/ivr/welcome", "CallSid=CA6&From=%2B1").await;
    post_form(&app, "/ivr/menu", "CallSid=CA6&From=%2B1&Digits=1").await;
    let (status, xml) = post_form(&app, "/ivr/menu", "CallSid=CA6&From=%2B1&Digits=1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains("Sorry"));
    assert!(!xml.contains("<Record"));
}

#[tokio::test]
async fn recent_events_are_bounded_and_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app_with(working_providers(), dir.path());
    post_form(&app, "/ivr/welcome", "CallSid=CA7&From=%2B1").await;

    let events = get_json(&app, "/api/v1/events/recent?limit=3").await;
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 3);
    let seqs: Vec<u64> = events.iter().map(|e| e["seq"].as_u64().unwrap()).collect();
    assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    assert!(events.iter().all(|e| e["kind"].is_string()));
}

#[tokio::test]
async fn sse_opens_with_metrics_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app_with(working_providers(), dir.path());
    let req = Request::builder().uri("/api/v1/events").body(Body::empty()).unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/event-stream");

    let mut body = res.into_body().into_data_stream();
    let first = tokio::time::timeout(Duration::from_secs(2), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8(first.to_vec()).unwrap();
    assert!(text.contains("event: metricsSnapshot"));
    assert!(!text.contains("id:"));
}
