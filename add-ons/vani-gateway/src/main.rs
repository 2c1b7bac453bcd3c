//! # Vani Gateway - Phone line and live event feed
//!
//! axum server that answers Twilio voice webhooks with TwiML and streams the orchestrator's
//! event bus to dashboards.
//!
//! ```text
//!   Twilio ──POST /ivr/*──► ivr handlers ──► Orchestrator ──► TwiML
//!                                                │
//!                                            EventBus ──► /api/v1/events (SSE)
//!                                                     └─► /api/v1/events/ws
//! ```

mod events;
mod ivr;
mod network;
mod state;
mod twiml;

use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vani_core::{EventBus, Feature, Orchestrator, VaniConfig};

use crate::state::AppState;

/// Every route of the gateway, with CORS and network-call recording applied.
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let audio_dir = state.config.audio_dir.clone();

    Router::new()
        .route("/ivr/welcome", post(ivr::welcome))
        .route("/ivr/menu", post(ivr::menu))
        .route("/ivr/question-recorded", post(ivr::question_recorded))
        .route("/ivr/process-summary", post(ivr::process_summary))
        .route("/ivr/status", post(ivr::status))
        .route("/health", get(events::health))
        .route("/api/v1/metrics", get(events::metrics))
        .route("/api/v1/calls", get(events::calls))
        .route("/api/v1/events", get(events::events_sse))
        .route("/api/v1/events/ws", get(events::events_ws))
        .route("/api/v1/events/recent", get(events::recent_events))
        .nest_service("/audio", ServeDir::new(audio_dir))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            network::record_network_call,
        ))
        .with_state(state)
        .layer(cors)
}

/// Announce every provider that is not configured so dashboards show it from the start.
fn announce_missing_features(bus: &EventBus, orchestrator: &Orchestrator) {
    let a = orchestrator.providers().availability();
    for (feature, up) in [
        (Feature::Transcription, a.transcription),
        (Feature::Generation, a.generation),
        (Feature::Synthesis, a.synthesis),
        (Feature::History, a.history),
    ] {
        if !up {
            bus.feature_status(feature, false, Some("provider not configured".to_string()));
        }
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!(target: "vani::gateway", "System Shutdown Initiated (Ctrl+C received)");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = VaniConfig::load()?;
    tokio::fs::create_dir_all(&config.audio_dir).await?;

    let bus = EventBus::new(config.bus());
    let _ticker = bus.spawn_metrics_ticker(Duration::from_secs(config.metrics_interval_secs.max(1)));
    let providers = vani_voice::build_providers(&config);
    let orchestrator = Orchestrator::new(bus.clone(), providers, config.orchestrator());
    announce_missing_features(&bus, &orchestrator);
    bus.log(vani_core::LogLevel::Info, "Vidya Vani gateway started");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let public = config.public_base_url.clone();
    let app = build_app(AppState::new(config, orchestrator));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(target: "vani::gateway", %addr, public = %public, "🚀 Vidya Vani gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!(target: "vani::gateway", "✓ Graceful shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests;
