use std::collections::VecDeque;
use vani_core::Event;

/// Pending events awaiting the next flush, plus the last `window` events seen.
#[derive(Debug)]
pub struct EventBuffer {
    pending: Vec<Event>,
    window: VecDeque<Event>,
    capacity: usize,
}

impl EventBuffer {
    pub fn new(window: usize) -> Self {
        Self {
            pending: Vec::new(),
            window: VecDeque::with_capacity(window.max(1)),
            capacity: window.max(1),
        }
    }

    /// Queue `event`. Urgent events flush everything pending right away, in order.
    pub fn push(&mut self, event: Event) -> Option<Vec<Event>> {
        let urgent = event.body.is_urgent();
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(event.clone());
        self.pending.push(event);
        urgent.then(|| self.flush())
    }

    pub fn flush(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Recent events, oldest first.
    pub fn history(&self) -> Vec<Event> {
        self.window.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vani_core::{EventBody, LogLevel};

    fn ev(seq: u64, level: LogLevel) -> Event {
        Event {
            seq,
            timestamp: Utc::now(),
            body: EventBody::log(level, format!("line {seq}")),
        }
    }

    #[test]
    fn routine_events_wait_for_flush() {
        let mut b = EventBuffer::new(10);
        assert!(b.push(ev(1, LogLevel::Info)).is_none());
        assert!(b.push(ev(2, LogLevel::Warning)).is_none());
        assert_eq!(b.pending(), 2);
        let out: Vec<u64> = b.flush().iter().map(|e| e.seq).collect();
        assert_eq!(out, vec![1, 2]);
        assert_eq!(b.pending(), 0);
    }

    #[test]
    fn urgent_event_flushes_in_order() {
        let mut b = EventBuffer::new(10);
        b.push(ev(1, LogLevel::Info));
        let out = b.push(ev(2, LogLevel::Error)).unwrap();
        assert_eq!(out.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(b.pending(), 0);
    }

    #[test]
    fn history_window_is_bounded() {
        let mut b = EventBuffer::new(100);
        for seq in 1..=150 {
            b.push(ev(seq, LogLevel::Info));
        }
        let h = b.history();
        assert_eq!(h.len(), 100);
        assert_eq!(h[0].seq, 51);
        assert_eq!(h[99].seq, 150);
    }
}
