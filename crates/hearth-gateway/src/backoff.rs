//! Reconnect delays: exponential growth with full jitter.
//!
//! `delay = random(0, min(cap, base * 2^attempt))`.

use std::time::Duration;

/// Delay calculator for consecutive reconnect attempts.
#[derive(Debug)]
pub(crate) struct Backoff {
    base_ms: u64,
    max_ms: u64,
    /// Attempts since the last reset (0-indexed).
    attempt: u32,
}

impl Backoff {
    pub(crate) fn new(base: Duration, max: Duration) -> Self {
        Self {
            base_ms: u64::try_from(base.as_millis()).unwrap_or(u64::MAX),
            max_ms: u64::try_from(max.as_millis()).unwrap_or(u64::MAX),
            attempt: 0,
        }
    }

    /// The next delay; advances the attempt counter.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let ceiling = self
            .base_ms
            .saturating_mul(1u64.checked_shl(self.attempt).unwrap_or(u64::MAX))
            .min(self.max_ms);
        self.attempt = self.attempt.saturating_add(1);
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(fastrand::u64(0..=ceiling))
    }

    /// Start over after a session became active.
    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
    }
}
