//! Tests for quota tracking and retry timing.

use chrono::{Duration as ChronoDuration, Utc};
use github_harvest::github::retry::{is_rate_limited_status, is_transient_status};
use github_harvest::github::{RateLimiter, ResponseHeaders, RetryPolicy};
use std::time::Duration;

fn headers(remaining: Option<u32>, reset: Option<i64>) -> ResponseHeaders {
    ResponseHeaders {
        rate_limit_remaining: remaining,
        rate_limit_limit: Some(5000),
        rate_limit_reset: reset,
        ..ResponseHeaders::default()
    }
}

#[test]
fn test_observe_keeps_previous_values_for_missing_headers() {
    let mut limiter = RateLimiter::new();
    limiter.observe(&headers(Some(42), Some(1_700_000_000)));
    limiter.observe(&ResponseHeaders::default());

    assert_eq!(limiter.remaining, Some(42));
    assert_eq!(limiter.limit, Some(5000));
    assert_eq!(limiter.reset_time.map(|t| t.timestamp()), Some(1_700_000_000));
    assert!(limiter.last_check.is_some());
}

#[test]
fn test_is_exhausted() {
    let mut limiter = RateLimiter::new();
    assert!(!limiter.is_exhausted());
    limiter.observe(&headers(Some(0), None));
    assert!(limiter.is_exhausted());
}

#[test]
fn test_no_pause_at_or_above_threshold() {
    let now = Utc::now();
    let mut limiter = RateLimiter::new();
    assert_eq!(
        limiter.preventive_pause(500, Duration::from_secs(300), Duration::from_secs(10), now),
        None,
        "unknown quota never pauses"
    );

    limiter.observe(&headers(Some(500), Some(now.timestamp() + 600)));
    assert_eq!(
        limiter.preventive_pause(500, Duration::from_secs(300), Duration::from_secs(10), now),
        None
    );
}

#[test]
fn test_pause_until_reset_plus_margin() {
    let now = Utc::now();
    let mut limiter = RateLimiter::new();
    limiter.reset_time = Some(now + ChronoDuration::seconds(120));
    limiter.remaining = Some(499);

    let pause = limiter
        .preventive_pause(500, Duration::from_secs(300), Duration::from_secs(10), now)
        .unwrap();
    assert_eq!(pause, Duration::from_secs(130));
}

#[test]
fn test_pause_falls_back_when_reset_is_past() {
    let now = Utc::now();
    let mut limiter = RateLimiter::new();
    limiter.reset_time = Some(now - ChronoDuration::seconds(5));
    limiter.remaining = Some(3);

    let pause = limiter
        .preventive_pause(500, Duration::from_secs(300), Duration::from_secs(10), now)
        .unwrap();
    assert_eq!(pause, Duration::from_secs(310));
}

#[test]
fn test_small_bucket_pauses_only_when_exhausted() {
    let now = Utc::now();
    let mut limiter = RateLimiter::new();
    limiter.limit = Some(30);
    limiter.reset_time = Some(now + ChronoDuration::seconds(45));

    limiter.remaining = Some(29);
    assert_eq!(
        limiter.preventive_pause(500, Duration::from_secs(300), Duration::from_secs(10), now),
        None
    );
    limiter.remaining = Some(1);
    assert_eq!(
        limiter.preventive_pause(500, Duration::from_secs(300), Duration::from_secs(10), now),
        None
    );

    limiter.remaining = Some(0);
    assert_eq!(
        limiter.preventive_pause(500, Duration::from_secs(300), Duration::from_secs(10), now),
        Some(Duration::from_secs(55))
    );
}

#[test]
fn test_exhausted_wait() {
    let now = Utc::now();
    let mut limiter = RateLimiter::new();
    assert_eq!(limiter.exhausted_wait(Duration::from_secs(10), now), None);

    limiter.reset_time = Some(now + ChronoDuration::seconds(60));
    assert_eq!(
        limiter.exhausted_wait(Duration::from_secs(10), now),
        Some(Duration::from_secs(70))
    );

    limiter.reset_time = Some(now - ChronoDuration::seconds(60));
    assert_eq!(limiter.exhausted_wait(Duration::from_secs(10), now), None);
}

#[test]
fn test_retry_delay_grows_linearly() {
    let policy = RetryPolicy::new(3, Duration::from_secs(5));
    assert_eq!(policy.delay_for(0), Duration::from_secs(5));
    assert_eq!(policy.delay_for(1), Duration::from_secs(10));
    assert_eq!(policy.delay_for(2), Duration::from_secs(15));
    assert!(policy.has_next(0));
    assert!(policy.has_next(1));
    assert!(!policy.has_next(2));
}

#[test]
fn test_retry_policy_makes_at_least_one_attempt() {
    let policy = RetryPolicy::new(0, Duration::from_secs(5));
    assert_eq!(policy.max_attempts, 1);
    assert!(!policy.has_next(0));
}

#[test]
fn test_status_classification() {
    for status in [502, 503, 504] {
        assert!(is_transient_status(status), "{status}");
    }
    for status in [200, 403, 404, 429, 500, 501, 505] {
        assert!(!is_transient_status(status), "{status}");
    }

    assert!(is_rate_limited_status(429, None));
    assert!(is_rate_limited_status(403, Some(0)));
    assert!(!is_rate_limited_status(403, Some(12)));
    assert!(!is_rate_limited_status(403, None));
    assert!(!is_rate_limited_status(200, Some(0)));
}
