//! Retry policy for transient failures

use std::time::Duration;

/// Bounded retry with linearly increasing delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after the zero-based `attempt` failed: 5s, 10s, 15s for a 5s base.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * (attempt + 1)
    }

    /// Whether another attempt follows the zero-based `attempt`
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

/// Gateway errors GitHub returns under load
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 502..=504)
}

/// Quota refusal: 403 with an exhausted quota, or 429
pub fn is_rate_limited_status(status: u16, remaining: Option<u32>) -> bool {
    status == 429 || (status == 403 && remaining == Some(0))
}
