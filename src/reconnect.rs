use std::time::Duration;

/// Bounded retry schedule for re-establishing the transport.
///
/// Attempt `n` (1-based) waits `base_delay * n`. Once `max_attempts`
/// retries have been handed out the policy is exhausted until [`reset`].
///
/// [`reset`]: ReconnectPolicy::reset
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    base_delay: Duration,
    attempt: u32,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            attempt: 0,
        }
    }

    /// Claim the next retry. `None` means retries are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        Some(self.base_delay.saturating_mul(self.attempt))
    }

    /// Called on successful connect and on caller-initiated `connect()`
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Retries handed out since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
