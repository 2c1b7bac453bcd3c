//! Rolling call and latency metrics derived from bus events.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use crate::event::{CallPhase, EventBody, Stage, StageStatus};

/// Point-in-time summary of call volume and latency. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_calls: u64,
    pub active_sessions: u64,
    pub avg_latency_ms: f64,
    pub latency_samples: usize,
    pub transcription_time_ms: Option<u64>,
    pub answer_time_ms: Option<u64>,
    pub synthesis_time_ms: Option<u64>,
    pub total_events: u64,
    pub uptime_secs: u64,
    pub connected_observers: usize,
}

/// Fixed-size sample window; oldest evicted first.
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    capacity: usize,
    samples: VecDeque<u64>,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, samples: VecDeque::with_capacity(capacity) }
    }

    pub fn push(&mut self, sample_ms: u64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample_ms);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<u64>() as f64 / self.samples.len() as f64
    }
}

#[derive(Debug)]
struct Counters {
    total_calls: u64,
    active_sessions: u64,
    latency: LatencyWindow,
    transcription_time_ms: Option<u64>,
    answer_time_ms: Option<u64>,
    synthesis_time_ms: Option<u64>,
    total_events: u64,
}

/// Maintains the rolling counters. Fed by the bus from its publish path.
#[derive(Debug)]
pub struct MetricsAggregator {
    started: Instant,
    counters: Mutex<Counters>,
}

impl MetricsAggregator {
    pub fn new(latency_window: usize) -> Self {
        Self {
            started: Instant::now(),
            counters: Mutex::new(Counters {
                total_calls: 0,
                active_sessions: 0,
                latency: LatencyWindow::new(latency_window),
                transcription_time_ms: None,
                answer_time_ms: None,
                synthesis_time_ms: None,
                total_events: 0,
            }),
        }
    }

    /// Account for one published event. Returns true when the event changed the
    /// aggregate (call start/end or a new latency sample) and a snapshot should be republished.
    pub fn observe(&self, body: &EventBody) -> bool {
        let mut c = match self.counters.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        c.total_events += 1;
        match body {
            EventBody::CallLifecycle { phase: CallPhase::Started, .. } => {
                c.total_calls += 1;
                c.active_sessions += 1;
                true
            }
            EventBody::CallLifecycle { phase: CallPhase::Ended, .. } => {
                c.active_sessions = c.active_sessions.saturating_sub(1);
                true
            }
            EventBody::PipelineStageUpdate {
                stage,
                status: StageStatus::Complete,
                duration_ms: Some(ms),
                ..
            } => {
                match stage {
                    Stage::Transcription => c.transcription_time_ms = Some(*ms),
                    Stage::AnswerGeneration => c.answer_time_ms = Some(*ms),
                    Stage::SpeechSynthesis => c.synthesis_time_ms = Some(*ms),
                    _ => {}
                }
                c.latency.push(*ms);
                true
            }
            _ => false,
        }
    }

    pub fn snapshot(&self, connected_observers: usize) -> MetricsSnapshot {
        let c = match self.counters.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        MetricsSnapshot {
            total_calls: c.total_calls,
            active_sessions: c.active_sessions,
            avg_latency_ms: c.latency.average(),
            latency_samples: c.latency.len(),
            transcription_time_ms: c.transcription_time_ms,
            answer_time_ms: c.answer_time_ms,
            synthesis_time_ms: c.synthesis_time_ms,
            total_events: c.total_events,
            uptime_secs: self.started.elapsed().as_secs(),
            connected_observers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CallId;

    fn lifecycle(phase: CallPhase) -> EventBody {
        EventBody::CallLifecycle { call_id: CallId::new("C1"), phase, caller: None }
    }

    fn completed(stage: Stage, ms: u64) -> EventBody {
        EventBody::PipelineStageUpdate {
            call_id: CallId::new("C1"),
            stage,
            status: StageStatus::Complete,
            state: None,
            duration_ms: Some(ms),
            detail: None,
        }
    }

    #[test]
    fn window_evicts_oldest() {
        let mut w = LatencyWindow::new(3);
        for s in [10, 20, 30, 40] {
            w.push(s);
        }
        assert_eq!(w.len(), 3);
        assert_eq!(w.average(), 30.0);
    }

    #[test]
    fn active_sessions_floor_at_zero() {
        let m = MetricsAggregator::new(10);
        assert!(m.observe(&lifecycle(CallPhase::Ended)));
        assert_eq!(m.snapshot(0).active_sessions, 0);
        m.observe(&lifecycle(CallPhase::Started));
        m.observe(&lifecycle(CallPhase::Started));
        m.observe(&lifecycle(CallPhase::Ended));
        let s = m.snapshot(2);
        assert_eq!(s.total_calls, 2);
        assert_eq!(s.active_sessions, 1);
        assert_eq!(s.connected_observers, 2);
    }

    #[test]
    fn stage_timings_overwrite_not_average() {
        let m = MetricsAggregator::new(10);
        m.observe(&completed(Stage::Transcription, 100));
        m.observe(&completed(Stage::Transcription, 300));
        m.observe(&completed(Stage::AnswerGeneration, 200));
        let s = m.snapshot(0);
        assert_eq!(s.transcription_time_ms, Some(300));
        assert_eq!(s.answer_time_ms, Some(200));
        assert_eq!(s.synthesis_time_ms, None);
        assert_eq!(s.latency_samples, 3);
        assert_eq!(s.avg_latency_ms, 200.0);
    }

    #[test]
    fn unrelated_events_only_count() {
        let m = MetricsAggregator::new(10);
        assert!(!m.observe(&EventBody::log(crate::event::LogLevel::Info, "hi")));
        assert_eq!(m.snapshot(0).total_events, 1);
    }
}
