//! Bus transport (WebSocket and SSE) plus the read-only dashboard endpoints.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};
use vani_core::{Event, EventBus, MetricsSnapshot, ObserverHandle, Session};

use crate::state::AppState;

const DEFAULT_RECENT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct SinceQuery {
    pub since: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

fn observe(bus: &EventBus, since: Option<u64>) -> ObserverHandle {
    match since {
        Some(seq) => bus.subscribe_since(seq),
        None => bus.subscribe(),
    }
}

/// GET /api/v1/events/ws?since=N – one JSON event per text frame.
pub async fn events_ws(
    State(state): State<AppState>,
    Query(q): Query<SinceQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let bus = state.bus.clone();
    ws.on_upgrade(move |socket| pump_ws(socket, bus, q.since))
}

async fn pump_ws(mut socket: WebSocket, bus: EventBus, since: Option<u64>) {
    let mut observer = observe(&bus, since);
    info!(target: "vani::gateway", observer = observer.id(), ?since, "🔭 observer connected (ws)");
    loop {
        tokio::select! {
            ev = observer.recv() => {
                let Some(ev) = ev else { break };
                let text = match serde_json::to_string(&ev) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(target: "vani::gateway", error = %e, "event encode failed");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    info!(target: "vani::gateway", observer = observer.id(), dropped = observer.dropped(), "observer disconnected (ws)");
    bus.unsubscribe(observer);
}

/// GET /api/v1/events?since=N – server-sent events; also honours `Last-Event-ID`.
pub async fn events_sse(
    State(state): State<AppState>,
    Query(q): Query<SinceQuery>,
    headers: HeaderMap,
) -> Sse<impl futures_util::Stream<Item = Result<SseEvent, Infallible>> + Send + 'static> {
    use async_stream::stream;

    let since = q.since.or_else(|| {
        headers
            .get("last-event-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    });
    let mut observer = observe(&state.bus, since);
    debug!(target: "vani::gateway", observer = observer.id(), ?since, "observer connected (sse)");
    let stream = stream! {
        while let Some(ev) = observer.recv().await {
            let data = match serde_json::to_string(&ev) {
                Ok(d) => d,
                Err(_) => continue,
            };
            let mut out = SseEvent::default().event(ev.body.kind()).data(data);
            if !ev.is_snapshot() {
                out = out.id(ev.seq.to_string());
            }
            yield Ok(out);
        }
    };
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}

/// GET /api/v1/events/recent?limit=N – ring buffer, oldest first.
pub async fn recent_events(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<Event>> {
    Json(state.bus.recent(q.limit.unwrap_or(DEFAULT_RECENT)))
}

/// GET /api/v1/metrics
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.bus.metrics())
}

/// GET /api/v1/calls – live sessions, oldest first.
pub async fn calls(State(state): State<AppState>) -> Json<Vec<Session>> {
    Json(state.orchestrator.sessions().await)
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let services = state.orchestrator.providers().availability();
    let all_up = services.transcription && services.generation && services.synthesis && services.history;
    Json(serde_json::json!({
        "status": if all_up { "ok" } else { "degraded" },
        "timestamp": chrono::Utc::now(),
        "services": services,
        "metrics": state.bus.metrics(),
    }))
}
