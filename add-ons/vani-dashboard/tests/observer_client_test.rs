//! Integration test: reconnecting observer over an in-process bus.
//!
//! Verifies that:
//! 1. A burst survives repeated connection drops with every event delivered once, in order.
//! 2. A connection that replays already-seen events does not produce duplicates.
//! 3. Urgent events are delivered without waiting for the flush interval.
//! 4. The client gives up after the configured number of reconnect attempts.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vani_core::{Event, EventBody, EventBus, LogLevel};
use vani_dashboard::{
    BusConnector, ConnectionState, Connector, EventSource, ObserverClient, ObserverError,
    ObserverFeed, ReconnectPolicy,
};

fn fast_policy(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy {
        base: Duration::from_millis(1),
        factor: 1.5,
        ceiling: Duration::from_millis(5),
        max_attempts,
    }
}

/// Cuts connections after `cut_after` events. With `replay_everything` only the first one is
/// cut and every later one restarts from the beginning of the bus history.
struct FlakyConnector {
    bus: EventBus,
    cut_after: usize,
    replay_everything: bool,
    sinces: Mutex<Vec<Option<u64>>>,
}

impl FlakyConnector {
    fn new(bus: &EventBus, cut_after: usize) -> Self {
        Self {
            bus: bus.clone(),
            cut_after,
            replay_everything: false,
            sinces: Mutex::new(Vec::new()),
        }
    }
}

struct FlakySource {
    inner: Box<dyn EventSource>,
    left: usize,
}

#[async_trait]
impl EventSource for FlakySource {
    async fn next_event(&mut self) -> Result<Option<Event>, ObserverError> {
        if self.left == 0 {
            return Err(ObserverError::Transport("connection reset".into()));
        }
        self.left -= 1;
        self.inner.next_event().await
    }
}

#[async_trait]
impl Connector for FlakyConnector {
    async fn connect(&self, since: Option<u64>) -> Result<Box<dyn EventSource>, ObserverError> {
        let first = {
            let mut sinces = self.sinces.lock().unwrap();
            sinces.push(since);
            sinces.len() == 1
        };
        let (asked, left) = if self.replay_everything && !first {
            (Some(0), usize::MAX)
        } else {
            (since, self.cut_after)
        };
        let inner = BusConnector::new(self.bus.clone()).connect(asked).await?;
        Ok(Box::new(FlakySource { inner, left }))
    }
}

struct AlwaysDown {
    calls: AtomicUsize,
}

#[async_trait]
impl Connector for AlwaysDown {
    async fn connect(&self, _since: Option<u64>) -> Result<Box<dyn EventSource>, ObserverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ObserverError::Connect("refused".into()))
    }
}

async fn connected(feed: &mut ObserverFeed) {
    tokio::time::timeout(
        Duration::from_secs(2),
        feed.state.wait_for(|s| *s == ConnectionState::Connected),
    )
    .await
    .expect("never connected")
    .unwrap();
}

/// Drain batches until `last` has been delivered; returns every sequenced event.
async fn collect_until(feed: &mut ObserverFeed, last: u64) -> Vec<Event> {
    let mut seen = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while seen.last().map(|e: &Event| e.seq) != Some(last) {
        let batch = tokio::time::timeout_at(deadline, feed.batches.recv())
            .await
            .expect("feed stalled")
            .expect("feed closed");
        seen.extend(batch.into_iter().filter(|e| !e.is_snapshot()));
    }
    seen
}

fn messages(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match &e.body {
            EventBody::Log { message, .. } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn burst_survives_connection_drops() {
    let bus = EventBus::default();
    let connector = Arc::new(FlakyConnector::new(&bus, 7));
    let mut feed = ObserverClient::new(connector.clone())
        .with_policy(fast_policy(5))
        .with_flush_interval(Duration::from_millis(10))
        .with_window(20)
        .spawn();
    connected(&mut feed).await;

    for i in 1..=50 {
        bus.log(LogLevel::Info, format!("msg {i}"));
    }
    let last = bus.last_seq();

    let seen = collect_until(&mut feed, last).await;
    assert!(seen.windows(2).all(|w| w[0].seq < w[1].seq), "out of order or duplicated");
    let expected: Vec<String> = (1..=50).map(|i| format!("msg {i}")).collect();
    assert_eq!(messages(&seen), expected);

    let sinces = connector.sinces.lock().unwrap().clone();
    assert!(sinces.len() > 5, "expected several reconnects, got {}", sinces.len());
    assert_eq!(sinces[0], None);
    let resumed: Vec<u64> = sinces[1..].iter().map(|s| s.unwrap_or(0)).collect();
    assert!(resumed.windows(2).all(|w| w[0] <= w[1]));

    let history = feed.history();
    assert_eq!(history.len(), 20);
    assert_eq!(history.iter().map(|e| e.seq).max(), Some(last));
}

#[tokio::test]
async fn replayed_events_are_not_repeated() {
    let bus = EventBus::default();
    let mut connector = FlakyConnector::new(&bus, 5);
    connector.replay_everything = true;
    let mut feed = ObserverClient::new(Arc::new(connector))
        .with_policy(fast_policy(5))
        .with_flush_interval(Duration::from_millis(10))
        .spawn();
    connected(&mut feed).await;

    for i in 1..=12 {
        bus.log(LogLevel::Info, format!("msg {i}"));
    }
    let last = bus.last_seq();

    let seen = collect_until(&mut feed, last).await;
    assert!(seen.windows(2).all(|w| w[0].seq < w[1].seq));
    assert_eq!(seen.len(), 12);
}

#[tokio::test]
async fn urgent_events_skip_the_flush_interval() {
    let bus = EventBus::default();
    let mut feed = ObserverClient::new(Arc::new(BusConnector::new(bus.clone())))
        .with_flush_interval(Duration::from_secs(3600))
        .spawn();
    connected(&mut feed).await;

    bus.log(LogLevel::Info, "one");
    bus.log(LogLevel::Info, "two");
    let failure = bus.log(LogLevel::Error, "transcription failed");

    let seen = tokio::time::timeout(Duration::from_secs(1), collect_until(&mut feed, failure.seq))
        .await
        .expect("urgent event was held back");
    assert_eq!(messages(&seen), vec!["one", "two", "transcription failed"]);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let connector = Arc::new(AlwaysDown { calls: AtomicUsize::new(0) });
    let feed = ObserverClient::new(connector.clone())
        .with_policy(fast_policy(3))
        .spawn();

    let result = tokio::time::timeout(Duration::from_secs(2), feed.task)
        .await
        .expect("client kept retrying")
        .unwrap();
    assert_eq!(result, Err(ObserverError::RetriesExhausted { attempts: 3 }));
    assert_eq!(*feed.state.borrow(), ConnectionState::Failed);
    assert_eq!(connector.calls.load(Ordering::SeqCst), 4);
}
