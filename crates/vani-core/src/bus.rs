//! **Event Broadcast Bus**: fan-out of typed events to every connected observer.
//!
//! Publication assigns a global sequence number under one lock and hands the event to a
//! `tokio::sync::broadcast` channel. Each observer drains its own cursor into that ring:
//! a slow observer lags and loses its oldest events (`RecvError::Lagged`) while the
//! publisher and every other observer carry on. The bus also keeps the last N events for
//! `recent()` and for gap-free resumption via `subscribe_since()`.

use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::BusConfig;
use crate::error::Feature;
use crate::event::{Event, EventBody, LogLevel};
use crate::metrics::{MetricsAggregator, MetricsSnapshot};

struct Ring {
    next_seq: u64,
    capacity: usize,
    events: VecDeque<Event>,
}

struct BusInner {
    tx: broadcast::Sender<Event>,
    ring: Mutex<Ring>,
    metrics: MetricsAggregator,
    observers: AtomicUsize,
    next_observer_id: AtomicU64,
}

impl BusInner {
    fn ring(&self) -> MutexGuard<'_, Ring> {
        match self.ring.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Cheap to clone; all clones publish into the same sequence.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl EventBus {
    pub fn new(config: BusConfig) -> Self {
        let (tx, _) = broadcast::channel(config.observer_queue_capacity.max(1));
        Self {
            inner: Arc::new(BusInner {
                tx,
                ring: Mutex::new(Ring {
                    next_seq: 1,
                    capacity: config.history_capacity.max(1),
                    events: VecDeque::with_capacity(config.history_capacity.max(1)),
                }),
                metrics: MetricsAggregator::new(config.latency_window),
                observers: AtomicUsize::new(0),
                next_observer_id: AtomicU64::new(1),
            }),
        }
    }

    /// Append to the ring buffer and forward to every observer. Never waits on observers.
    /// Call start/end and latency samples also republish a fresh `metricsSnapshot`.
    pub fn publish(&self, body: EventBody) -> Event {
        let event = self.append(body);
        if self.inner.metrics.observe(&event.body) {
            let snapshot = self.metrics();
            let derived = self.append(EventBody::MetricsSnapshot(snapshot));
            self.inner.metrics.observe(&derived.body);
        }
        event
    }

    fn append(&self, body: EventBody) -> Event {
        let mut ring = self.inner.ring();
        let event = Event { seq: ring.next_seq, timestamp: Utc::now(), body };
        ring.next_seq += 1;
        if ring.events.len() == ring.capacity {
            ring.events.pop_front();
        }
        ring.events.push_back(event.clone());
        // Sent under the ring lock so sequence order and channel order agree.
        let _ = self.inner.tx.send(event.clone());
        drop(ring);
        debug!(target: "vani::bus", seq = event.seq, kind = event.body.kind(), "published");
        event
    }

    /// Publish a free-text log line.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> Event {
        self.publish(EventBody::log(level, message))
    }

    /// Publish an explicit availability change for a pipeline feature.
    pub fn feature_status(&self, feature: Feature, available: bool, reason: Option<String>) -> Event {
        self.publish(EventBody::FeatureStatus { feature, available, reason })
    }

    /// Register an observer. The first event it receives is a `metricsSnapshot` with `seq == 0`.
    pub fn subscribe(&self) -> ObserverHandle {
        let ring = self.inner.ring();
        let rx = self.inner.tx.subscribe();
        let last_seq = ring.next_seq.saturating_sub(1);
        drop(ring);
        self.register(rx, last_seq, VecDeque::new(), 0)
    }

    /// Register an observer that already saw everything up to `since`. Buffered events newer
    /// than `since` are replayed before live delivery resumes, with no duplicates and no gap
    /// unless the buffer no longer reaches back that far.
    pub fn subscribe_since(&self, since: u64) -> ObserverHandle {
        let ring = self.inner.ring();
        let rx = self.inner.tx.subscribe();
        let replay: VecDeque<Event> =
            ring.events.iter().filter(|e| e.seq > since).cloned().collect();
        let oldest = ring.events.front().map(|e| e.seq).unwrap_or(ring.next_seq);
        let missed = oldest.saturating_sub(since.saturating_add(1));
        let last_seq = ring.next_seq.saturating_sub(1);
        drop(ring);
        if missed > 0 {
            warn!(target: "vani::bus", since, missed, "observer resumed past the history window");
        }
        self.register(rx, last_seq, replay, missed)
    }

    fn register(
        &self,
        rx: broadcast::Receiver<Event>,
        last_seq: u64,
        mut pending: VecDeque<Event>,
        dropped: u64,
    ) -> ObserverHandle {
        let id = self.inner.next_observer_id.fetch_add(1, Ordering::Relaxed);
        let connected = self.inner.observers.fetch_add(1, Ordering::SeqCst) + 1;
        pending.push_front(Event {
            seq: 0,
            timestamp: Utc::now(),
            body: EventBody::MetricsSnapshot(self.inner.metrics.snapshot(connected)),
        });
        debug!(target: "vani::bus", observer = id, connected, "observer subscribed");
        ObserverHandle {
            id,
            rx,
            pending,
            last_seq,
            dropped,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deregister an observer. Publishing is unaffected.
    pub fn unsubscribe(&self, handle: ObserverHandle) {
        debug!(target: "vani::bus", observer = handle.id, "observer unsubscribed");
        drop(handle);
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.load(Ordering::SeqCst)
    }

    /// Current aggregate state.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot(self.observer_count())
    }

    /// Up to `limit` most recent events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<Event> {
        let ring = self.inner.ring();
        let skip = ring.events.len().saturating_sub(limit);
        ring.events.iter().skip(skip).cloned().collect()
    }

    /// Sequence number of the last published event (0 if none).
    pub fn last_seq(&self) -> u64 {
        self.inner.ring().next_seq.saturating_sub(1)
    }

    /// Republish a metrics snapshot on a fixed interval. Stops once every bus clone is dropped.
    pub fn spawn_metrics_ticker(&self, every: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let bus = EventBus { inner };
                let snapshot = bus.metrics();
                bus.publish(EventBody::MetricsSnapshot(snapshot));
            }
        })
    }
}

/// One observer's cursor into the bus.
pub struct ObserverHandle {
    id: u64,
    rx: broadcast::Receiver<Event>,
    pending: VecDeque<Event>,
    last_seq: u64,
    dropped: u64,
    bus: Weak<BusInner>,
}

impl ObserverHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Events this observer lost because it fell behind (oldest first).
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Sequence number of the last event delivered to this observer.
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Next event in publication order; `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            if let Some(ev) = self.take_pending() {
                return Some(ev);
            }
            match self.rx.recv().await {
                Ok(ev) => {
                    if let Some(ev) = self.accept(ev) {
                        return Some(ev);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => self.lagged(n),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`ObserverHandle::recv`].
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            if let Some(ev) = self.take_pending() {
                return Some(ev);
            }
            match self.rx.try_recv() {
                Ok(ev) => {
                    if let Some(ev) = self.accept(ev) {
                        return Some(ev);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => self.lagged(n),
                Err(_) => return None,
            }
        }
    }

    fn take_pending(&mut self) -> Option<Event> {
        let ev = self.pending.pop_front()?;
        if ev.seq > self.last_seq {
            self.last_seq = ev.seq;
        }
        Some(ev)
    }

    fn accept(&mut self, ev: Event) -> Option<Event> {
        if ev.seq <= self.last_seq {
            return None;
        }
        self.last_seq = ev.seq;
        Some(ev)
    }

    fn lagged(&mut self, n: u64) {
        self.dropped += n;
        warn!(target: "vani::bus", observer = self.id, dropped = n, "observer lagging; oldest events dropped");
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.observers.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
