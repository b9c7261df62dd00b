//! Exponential backoff for re-establishing subscriptions.

use std::time::Duration;

/// Highest exponent applied to the initial delay.
const MAX_EXPONENT: u32 = 16;

/// Delay policy used between failed (re)bind attempts.
///
/// Attempt `n` waits `initial * 2^n`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBackoff {
    pub initial: Duration,
    pub max: Duration,
}

impl ReconnectBackoff {
    pub const fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    /// Delay before the given (zero-based) attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(MAX_EXPONENT));
        self.initial.saturating_mul(factor).min(self.max)
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(64))
    }
}
