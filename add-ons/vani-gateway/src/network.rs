use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use vani_core::EventBody;

use crate::state::AppState;

/// Bus transport endpoints. Never recorded.
fn is_transport(path: &str) -> bool {
    path.starts_with("/api/v1/events")
}

/// Publish a `networkCallRecord` for every inbound request.
pub async fn record_network_call(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    if !is_transport(&path) {
        state.bus.publish(EventBody::NetworkCallRecord {
            method,
            endpoint: path,
            status: response.status().as_u16(),
            latency_ms: started.elapsed().as_millis() as u64,
        });
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_paths_are_skipped() {
        assert!(is_transport("/api/v1/events"));
        assert!(is_transport("/api/v1/events/ws"));
        assert!(is_transport("/api/v1/events/recent"));
        assert!(!is_transport("/ivr/menu"));
        assert!(!is_transport("/api/v1/metrics"));
    }
}
