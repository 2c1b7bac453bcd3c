//! Terminal dashboard: prints the gateway's live event feed.
//!
//! Usage: `vani-dashboard [ws://host:port]` (or `VANI_DASHBOARD_URL`).

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vani_dashboard::view::{render, render_state};
use vani_dashboard::{ObserverClient, WsConnector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("VANI_DASHBOARD_URL").ok())
        .unwrap_or_else(|| "ws://localhost:3000".to_string());
    info!(target: "vani::dashboard", %url, "📡 Watching Vidya Vani event feed");

    let mut feed = ObserverClient::new(Arc::new(WsConnector::new(url))).spawn();
    let mut state = feed.state.clone();

    loop {
        tokio::select! {
            batch = feed.batches.recv() => {
                let Some(batch) = batch else { break };
                for ev in &batch {
                    println!("{}", render(ev));
                }
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let s = state.borrow_and_update().clone();
                println!("-- {}", render_state(&s));
            }
            _ = tokio::signal::ctrl_c() => {
                info!(target: "vani::dashboard", "Dashboard stopped (Ctrl+C received)");
                feed.task.abort();
                return Ok(());
            }
        }
    }

    match feed.task.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.into()),
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(e.into()),
    }
}
