//! GitHub API client wrapper
//!
//! Wraps Octocrab for the typed endpoints the harvester does not route
//! through its own retry loop, currently the rate-limit status endpoint.
//!
//! # Examples
//!
//! ```rust,no_run
//! use github_harvest::GitHubClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gh = GitHubClient::with_token("ghp_...")?;
//!     let quota = gh.rate_limit_status().await?;
//!     println!("{} core requests left", quota.core.remaining);
//!     Ok(())
//! }
//! ```

use crate::github::error::{GitHubError, GitHubResult};
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::Serialize;
use std::sync::Arc;

/// GitHub API client wrapper that encapsulates Octocrab.
///
/// Cloning is cheap (Arc clone).
#[derive(Clone, Debug)]
pub struct GitHubClient {
    inner: Arc<Octocrab>,
}

/// One rate-limit bucket
#[derive(Debug, Clone, Serialize)]
pub struct Quota {
    pub limit: u64,
    pub remaining: u64,
    pub reset: DateTime<Utc>,
}

/// Current quota of the buckets the harvester draws from
#[derive(Debug, Clone, Serialize)]
pub struct QuotaSnapshot {
    pub core: Quota,
    pub search: Quota,
}

impl GitHubClient {
    /// Create a new client builder
    #[must_use]
    pub fn builder() -> GitHubClientBuilder {
        GitHubClientBuilder::new()
    }

    /// Convenience: create client with personal access token
    pub fn with_token(token: impl Into<String>) -> GitHubResult<Self> {
        Self::builder().personal_token(token).build()
    }

    /// Get inner Octocrab client
    #[must_use]
    pub fn inner(&self) -> &Arc<Octocrab> {
        &self.inner
    }

    /// Query `/rate_limit`. Does not count against the quota.
    pub async fn rate_limit_status(&self) -> GitHubResult<QuotaSnapshot> {
        let rate_limit = self.inner.ratelimit().get().await?;
        let quota = |rate: &octocrab::models::Rate| Quota {
            limit: rate.limit as u64,
            remaining: rate.remaining as u64,
            reset: DateTime::from_timestamp(rate.reset as i64, 0)
                .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(1)),
        };

        Ok(QuotaSnapshot {
            core: quota(&rate_limit.resources.core),
            search: quota(&rate_limit.resources.search),
        })
    }
}

/// Builder for creating `GitHubClient`
pub struct GitHubClientBuilder {
    token: Option<String>,
    base_uri: Option<String>,
}

impl GitHubClientBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: None,
            base_uri: None,
        }
    }

    /// Set personal access token for authentication
    pub fn personal_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set base URI (for GitHub Enterprise)
    pub fn base_uri(mut self, uri: impl Into<String>) -> Self {
        self.base_uri = Some(uri.into());
        self
    }

    /// Build the `GitHubClient`
    pub fn build(self) -> GitHubResult<GitHubClient> {
        let mut builder = Octocrab::builder();

        if let Some(token) = self.token {
            builder = builder.personal_token(token);
        }

        if let Some(uri) = self.base_uri {
            builder = builder
                .base_uri(&uri)
                .map_err(|e| GitHubError::ClientSetup(e.to_string()))?;
        }

        let octocrab = builder
            .build()
            .map_err(|e| GitHubError::ClientSetup(e.to_string()))?;

        Ok(GitHubClient {
            inner: Arc::new(octocrab),
        })
    }
}

impl Default for GitHubClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
