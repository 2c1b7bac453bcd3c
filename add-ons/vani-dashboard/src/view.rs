//! One-line terminal rendering of feed events.

use vani_core::{CallPhase, Event, EventBody, LogLevel, StageStatus};

use crate::client::ConnectionState;

pub fn render(ev: &Event) -> String {
    let at = ev.timestamp.format("%H:%M:%S");
    let line = match &ev.body {
        EventBody::Log { level, message, call_id, .. } => {
            let tag = match level {
                LogLevel::Info => "INFO",
                LogLevel::Success => " OK ",
                LogLevel::Warning => "WARN",
                LogLevel::Error => "FAIL",
            };
            match call_id {
                Some(id) => format!("[{tag}] {id}: {message}"),
                None => format!("[{tag}] {message}"),
            }
        }
        EventBody::PipelineStageUpdate { call_id, stage, status, duration_ms, detail, .. } => {
            let mark = match status {
                StageStatus::Active => "→",
                StageStatus::Processing => "…",
                StageStatus::Complete => "✓",
                StageStatus::Error => "✗",
            };
            let mut s = format!("{mark} {call_id} {stage}");
            if let Some(ms) = duration_ms {
                s.push_str(&format!(" ({ms} ms)"));
            }
            if let Some(d) = detail {
                s.push_str(&format!(": {d}"));
            }
            s
        }
        EventBody::MetricsSnapshot(m) => format!(
            "calls {} active {} avg {:.0} ms observers {}",
            m.total_calls, m.active_sessions, m.avg_latency_ms, m.connected_observers
        ),
        EventBody::NetworkCallRecord { method, endpoint, status, latency_ms } => {
            format!("{method} {endpoint} {status} {latency_ms} ms")
        }
        EventBody::CallLifecycle { call_id, phase, caller } => match phase {
            CallPhase::Started => {
                format!("☎ {call_id} started ({})", caller.as_deref().unwrap_or("unknown caller"))
            }
            CallPhase::Ended => format!("☎ {call_id} ended"),
        },
        EventBody::FeatureStatus { feature, available, reason } => {
            let up = if *available { "available" } else { "unavailable" };
            match reason {
                Some(r) => format!("{feature} {up}: {r}"),
                None => format!("{feature} {up}"),
            }
        }
    };
    format!("{at} #{:<6} {line}", ev.seq)
}

pub fn render_state(state: &ConnectionState) -> String {
    match state {
        ConnectionState::Connecting => "connecting...".to_string(),
        ConnectionState::Connected => "connected".to_string(),
        ConnectionState::Reconnecting { attempt, delay } => {
            format!("reconnecting (attempt {attempt}) in {:.1}s", delay.as_secs_f64())
        }
        ConnectionState::Failed => "disconnected, giving up".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;
    use vani_core::{CallId, Stage};

    #[test]
    fn stage_lines_show_duration() {
        let ev = Event {
            seq: 12,
            timestamp: Utc::now(),
            body: EventBody::PipelineStageUpdate {
                call_id: CallId::new("CA9"),
                stage: Stage::Transcription,
                status: StageStatus::Complete,
                state: None,
                duration_ms: Some(840),
                detail: None,
            },
        };
        let line = render(&ev);
        assert!(line.contains("#12"));
        assert!(line.ends_with("✓ CA9 transcription (840 ms)"));
    }

    #[test]
    fn reconnect_state_names_the_attempt() {
        let s = render_state(&ConnectionState::Reconnecting { attempt: 2, delay: Duration::from_millis(4500) });
        assert_eq!(s, "reconnecting (attempt 2) in 4.5s");
    }
}
