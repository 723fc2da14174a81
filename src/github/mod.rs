//! GitHub API access
//!
//! REST and GraphQL requests go through [`ApiClient`], which owns the retry,
//! cooldown and rate-limit handling. [`GitHubClient`] wraps octocrab for the
//! typed quota endpoint.

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod graphql;
pub mod paginate;
pub mod rate_limiter;
pub mod rest;
pub mod retry;
pub mod transport;

// Re-export client types
pub use client::{GitHubClient, GitHubClientBuilder, Quota, QuotaSnapshot};

// Re-export error types
pub use error::{GitHubError, GitHubResult};

pub use config::FetchConfig;
pub use fetch::{ApiClient, CORE_BUCKET};
pub use paginate::{Collected, Page, PageSource, StopReason, Termination, collect_pages};
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;
pub use transport::{
    ApiRequest, ApiResponse, HttpTransport, Method, ResponseHeaders, Transport, TransportError,
};
