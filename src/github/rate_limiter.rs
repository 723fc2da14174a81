//! Rate limiting support

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::github::transport::ResponseHeaders;

/// Last quota reported by the API
#[derive(Debug, Clone)]
pub struct RateLimiter {
    pub remaining: Option<u32>,
    pub limit: Option<u32>,
    pub reset_time: Option<DateTime<Utc>>,
    pub last_check: Option<DateTime<Utc>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            remaining: None,
            limit: None,
            reset_time: None,
            last_check: None,
        }
    }

    /// Record the quota headers of a response. Missing headers leave the
    /// previous values in place.
    pub fn observe(&mut self, headers: &ResponseHeaders) {
        if let Some(remaining) = headers.rate_limit_remaining {
            self.remaining = Some(remaining);
        }
        if let Some(limit) = headers.rate_limit_limit {
            self.limit = Some(limit);
        }
        if let Some(reset) = headers
            .rate_limit_reset
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
        {
            self.reset_time = Some(reset);
        }
        self.last_check = Some(Utc::now());
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// How long to sleep before the next request when the quota has dropped
    /// below `threshold`.
    ///
    /// Waits until the reset time plus `margin` if it lies in the future,
    /// otherwise `fallback + margin`. A bucket whose whole limit is at or
    /// under `threshold` (search allows 30 a minute) only pauses once it is
    /// exhausted.
    pub fn preventive_pause(
        &self,
        threshold: u32,
        fallback: Duration,
        margin: Duration,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        let remaining = self.remaining?;
        let threshold = match self.limit {
            Some(limit) if limit <= threshold => 1,
            _ => threshold,
        };
        if remaining >= threshold {
            return None;
        }
        Some(self.until_reset(now).unwrap_or(fallback) + margin)
    }

    /// Sleep required after the API refused a request for quota reasons.
    /// `None` when the reset time is unknown or already past.
    pub fn exhausted_wait(&self, margin: Duration, now: DateTime<Utc>) -> Option<Duration> {
        self.until_reset(now).map(|wait| wait + margin)
    }

    fn until_reset(&self, now: DateTime<Utc>) -> Option<Duration> {
        let reset = self.reset_time?;
        if reset <= now {
            return None;
        }
        (reset - now).to_std().ok()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
