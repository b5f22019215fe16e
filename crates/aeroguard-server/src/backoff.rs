//! Retry gate for calls to external providers.
//!
//! After each consecutive failure the gate stays closed for twice as long as
//! before (plus up to 20% jitter), capped at `max`. A success reopens it.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const JITTER_RATIO: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
    retry_at: Option<Instant>,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            max: max.max(base),
            failures: 0,
            retry_at: None,
        }
    }

    pub fn can_attempt(&self, now: Instant) -> bool {
        self.retry_at.map_or(true, |at| now >= at)
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.retry_at = None;
    }

    /// Close the gate and return how long it stays closed.
    pub fn record_failure(&mut self, now: Instant) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let exponent = self.failures.min(16);
        let delay = self.base.saturating_mul(1u32 << exponent).min(self.max);
        let delay = delay + jitter(delay);
        self.retry_at = Some(now + delay);
        delay
    }
}

fn jitter(delay: Duration) -> Duration {
    let max_ms = (delay.as_millis() as f64 * JITTER_RATIO) as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    Duration::from_millis(nanos % (max_ms + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_until_first_failure() {
        let backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(60));
        assert!(backoff.can_attempt(Instant::now()));
    }

    #[test]
    fn failure_closes_gate_until_delay_elapses() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(60));
        let now = Instant::now();
        let delay = backoff.record_failure(now);
        assert!(delay >= Duration::from_secs(2));
        assert!(delay <= Duration::from_millis(2400));
        assert!(!backoff.can_attempt(now));
        assert!(backoff.can_attempt(now + delay));

        backoff.record_success();
        assert_eq!(backoff.failures(), 0);
        assert!(backoff.can_attempt(now));
    }

    #[test]
    fn delay_is_capped() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(10));
        let now = Instant::now();
        for _ in 0..8 {
            backoff.record_failure(now);
        }
        let delay = backoff.record_failure(now);
        assert!(delay >= Duration::from_secs(10));
        assert!(delay <= Duration::from_secs(12));
    }
}
