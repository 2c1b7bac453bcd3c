use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use vani_core::{Event, EventBus, ObserverHandle};

use crate::client::{Connector, EventSource};
use crate::error::ObserverError;

/// Connects to a gateway's `/api/v1/events/ws` endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    base_url: String,
}

impl WsConnector {
    /// `base_url` is the gateway root, e.g. `ws://localhost:3000`. `http(s)://` is accepted too.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        let base = if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else {
            base
        };
        Self { base_url: base.trim_end_matches('/').to_string() }
    }

    pub fn url(&self, since: Option<u64>) -> String {
        match since {
            Some(seq) => format!("{}/api/v1/events/ws?since={seq}", self.base_url),
            None => format!("{}/api/v1/events/ws", self.base_url),
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, since: Option<u64>) -> Result<Box<dyn EventSource>, ObserverError> {
        let url = self.url(since);
        let (ws, _resp) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| ObserverError::Connect(format!("{url}: {e}")))?;
        Ok(Box::new(WsSource { ws }))
    }
}

struct WsSource {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl EventSource for WsSource {
    async fn next_event(&mut self) -> Result<Option<Event>, ObserverError> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(txt))) => return decode(&txt).map(Some),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // Ping, pong and binary frames carry no events.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(ObserverError::Transport(e.to_string())),
            }
        }
    }
}

pub fn decode(txt: &str) -> Result<Event, ObserverError> {
    serde_json::from_str(txt).map_err(|e| ObserverError::Decode(e.to_string()))
}

/// Observes an in-process bus directly.
#[derive(Debug, Clone)]
pub struct BusConnector {
    bus: EventBus,
}

impl BusConnector {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl Connector for BusConnector {
    async fn connect(&self, since: Option<u64>) -> Result<Box<dyn EventSource>, ObserverError> {
        let handle = match since {
            Some(seq) => self.bus.subscribe_since(seq),
            None => self.bus.subscribe(),
        };
        Ok(Box::new(BusSource { handle }))
    }
}

struct BusSource {
    handle: ObserverHandle,
}

#[async_trait]
impl EventSource for BusSource {
    async fn next_event(&mut self) -> Result<Option<Event>, ObserverError> {
        Ok(self.handle.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_urls() {
        let c = WsConnector::new("http://localhost:3000/");
        assert_eq!(c.url(None), "ws://localhost:3000/api/v1/events/ws");
        assert_eq!(c.url(Some(42)), "ws://localhost:3000/api/v1/events/ws?since=42");
        assert_eq!(
            WsConnector::new("https://vani.example").url(None),
            "wss://vani.example/api/v1/events/ws"
        );
    }

    #[test]
    fn undecodable_frame_is_an_error() {
        assert!(matches!(decode("{\"kind\":\"nope\"}"), Err(ObserverError::Decode(_))));
        let ev = decode(r#"{"seq":5,"timestamp":"2024-01-01T00:00:00Z","kind":"log","level":"info","message":"hi"}"#)
            .unwrap();
        assert_eq!(ev.seq, 5);
    }
}
