use std::time::Duration;

/// Exponential reconnect backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub factor: f64,
    pub ceiling: Duration,
    /// Consecutive failed attempts before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(3),
            factor: 1.5,
            ceiling: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Wait before attempt `attempt` (1-based): `min(base * factor^(attempt-1), ceiling)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(64) as i32;
        let secs = self.base.as_secs_f64() * self.factor.powi(exp);
        if !secs.is_finite() || secs >= self.ceiling.as_secs_f64() {
            return self.ceiling;
        }
        Duration::from_secs_f64(secs)
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        attempt > self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule() {
        let p = ReconnectPolicy::default();
        assert_eq!(p.delay(1), Duration::from_secs(3));
        assert_eq!(p.delay(2), Duration::from_millis(4500));
        assert_eq!(p.delay(3), Duration::from_millis(6750));
        assert_eq!(p.delay(20), Duration::from_secs(30));
    }

    #[test]
    fn delays_never_decrease_and_stay_capped() {
        let p = ReconnectPolicy::default();
        let mut prev = Duration::ZERO;
        for attempt in 1..=40 {
            let d = p.delay(attempt);
            assert!(d >= prev, "attempt {attempt}");
            assert!(d <= p.ceiling);
            prev = d;
        }
    }

    #[test]
    fn exhaustion_after_max_attempts() {
        let p = ReconnectPolicy::default();
        assert!(!p.exhausted(5));
        assert!(p.exhausted(6));
    }
}
