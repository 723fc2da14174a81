//! Configuration for fetch operations

use std::time::Duration;

/// Configuration for fetch operations
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub rest_base_url: String,
    pub graphql_url: String,
    pub user_agent: String,
    /// Cooldown slept before every attempt
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    /// Linear backoff step: attempt `n` waits `retry_base_delay * (n + 1)`
    pub retry_base_delay: Duration,
    /// Pause preventively once fewer requests than this remain
    pub rate_limit_threshold: u32,
    /// Pause used when the reset time is unknown or already past
    pub rate_limit_pause: Duration,
    /// Extra slack added on top of the reported reset time
    pub reset_margin: Duration,
    pub page_size: u8,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            rest_base_url: "https://api.github.com".to_string(),
            graphql_url: "https://api.github.com/graphql".to_string(),
            user_agent: "github-harvest".to_string(),
            request_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_base_delay: Duration::from_secs(5),
            rate_limit_threshold: 500,
            rate_limit_pause: Duration::from_secs(300),
            reset_margin: Duration::from_secs(10),
            page_size: 100, // GitHub API max
        }
    }
}
