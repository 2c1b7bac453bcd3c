//! Reconnecting observer of the event feed.
//!
//! The client owns one connection at a time. Every event it forwards has a sequence number
//! above the last one it forwarded, so a resumed connection that replays a few events never
//! shows them twice. Routine events are batched per flush interval; urgent ones go out at once.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vani_core::Event;

use crate::buffer::EventBuffer;
use crate::error::ObserverError;
use crate::policy::ReconnectPolicy;

/// One live connection to the feed.
#[async_trait]
pub trait EventSource: Send {
    /// Next event, `Ok(None)` when the peer closed the connection.
    async fn next_event(&mut self) -> Result<Option<Event>, ObserverError>;
}

/// Opens connections. `since` is the last sequence number already seen, if any.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, since: Option<u64>) -> Result<Box<dyn EventSource>, ObserverError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting { attempt: u32, delay: Duration },
    Failed,
}

/// Handles returned by [`ObserverClient::spawn`].
pub struct ObserverFeed {
    pub batches: mpsc::Receiver<Vec<Event>>,
    pub state: watch::Receiver<ConnectionState>,
    pub task: JoinHandle<Result<(), ObserverError>>,
    buffer: Arc<Mutex<EventBuffer>>,
}

impl ObserverFeed {
    /// The most recent events seen, oldest first.
    pub fn history(&self) -> Vec<Event> {
        lock(&self.buffer).history()
    }
}

pub struct ObserverClient {
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    flush_interval: Duration,
    window: usize,
}

enum Flow {
    /// Connection ended; reconnect.
    Lost(String),
    /// Nobody is reading batches anymore.
    Stop,
}

impl ObserverClient {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            policy: ReconnectPolicy::default(),
            flush_interval: Duration::from_millis(250),
            window: 100,
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_flush_interval(mut self, every: Duration) -> Self {
        self.flush_interval = every.max(Duration::from_millis(1));
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn spawn(self) -> ObserverFeed {
        let (batch_tx, batches) = mpsc::channel(64);
        let (state_tx, state) = watch::channel(ConnectionState::Connecting);
        let buffer = Arc::new(Mutex::new(EventBuffer::new(self.window)));
        let shared = buffer.clone();
        let task = tokio::spawn(async move { self.run(batch_tx, state_tx, shared).await });
        ObserverFeed { batches, state, task, buffer }
    }

    async fn run(
        self,
        tx: mpsc::Sender<Vec<Event>>,
        state: watch::Sender<ConnectionState>,
        buffer: Arc<Mutex<EventBuffer>>,
    ) -> Result<(), ObserverError> {
        let mut last_seq = 0u64;
        let mut attempt = 0u32;

        loop {
            let since = (last_seq > 0).then_some(last_seq);
            match self.connector.connect(since).await {
                Ok(mut source) => {
                    attempt = 0;
                    let _ = state.send(ConnectionState::Connected);
                    info!(target: "vani::dashboard", ?since, "✓ Connected to event feed");
                    match self.pump(source.as_mut(), &mut last_seq, &tx, &buffer).await {
                        Flow::Stop => return Ok(()),
                        Flow::Lost(reason) => {
                            warn!(target: "vani::dashboard", last_seq, %reason, "event feed lost")
                        }
                    }
                }
                Err(e) => warn!(target: "vani::dashboard", attempt, error = %e, "connect failed"),
            }

            attempt += 1;
            if self.policy.exhausted(attempt) {
                let _ = state.send(ConnectionState::Failed);
                let attempts = attempt - 1;
                warn!(target: "vani::dashboard", attempts, "giving up on event feed");
                return Err(ObserverError::RetriesExhausted { attempts });
            }
            let delay = self.policy.delay(attempt);
            let _ = state.send(ConnectionState::Reconnecting { attempt, delay });
            debug!(target: "vani::dashboard", attempt, ?delay, "reconnecting");
            tokio::time::sleep(delay).await;
        }
    }

    async fn pump(
        &self,
        source: &mut dyn EventSource,
        last_seq: &mut u64,
        tx: &mpsc::Sender<Vec<Event>>,
        buffer: &Mutex<EventBuffer>,
    ) -> Flow {
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                next = source.next_event() => {
                    let ev = match next {
                        Ok(Some(ev)) => ev,
                        Ok(None) => return finish(tx, buffer, "closed by peer".to_string()).await,
                        Err(e) => return finish(tx, buffer, e.to_string()).await,
                    };
                    if !ev.is_snapshot() {
                        if ev.seq <= *last_seq {
                            continue;
                        }
                        *last_seq = ev.seq;
                    }
                    let urgent = lock(buffer).push(ev);
                    if let Some(batch) = urgent {
                        if tx.send(batch).await.is_err() {
                            return Flow::Stop;
                        }
                    }
                }
                _ = ticker.tick() => {
                    let batch = lock(buffer).flush();
                    if !batch.is_empty() && tx.send(batch).await.is_err() {
                        return Flow::Stop;
                    }
                }
            }
        }
    }
}

/// Deliver whatever is still pending before reporting the connection as lost.
async fn finish(tx: &mpsc::Sender<Vec<Event>>, buffer: &Mutex<EventBuffer>, reason: String) -> Flow {
    let batch = lock(buffer).flush();
    if !batch.is_empty() && tx.send(batch).await.is_err() {
        return Flow::Stop;
    }
    Flow::Lost(reason)
}

fn lock(buffer: &Mutex<EventBuffer>) -> MutexGuard<'_, EventBuffer> {
    match buffer.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}
