//! Request execution with retry and rate-limit handling

use chrono::Utc;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::time::sleep;

use crate::github::config::FetchConfig;
use crate::github::error::{GitHubError, GitHubResult};
use crate::github::graphql::GraphQlResponse;
use crate::github::rate_limiter::RateLimiter;
use crate::github::retry::{RetryPolicy, is_rate_limited_status, is_transient_status};
use crate::github::transport::{
    ApiRequest, ApiResponse, ResponseHeaders, Transport, TransportError,
};

/// Bucket charged when a response does not name one and the URL gives no hint
pub const CORE_BUCKET: &str = "core";

/// Sequential API client shared by every collection job.
pub struct ApiClient<T> {
    transport: T,
    config: FetchConfig,
    /// Quota per bucket (`core`, `search`, `graphql`)
    rate_limits: RwLock<HashMap<String, RateLimiter>>,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, config: FetchConfig) -> Self {
        Self {
            transport,
            config,
            rate_limits: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Snapshot of the last quota reported for `bucket`
    pub async fn rate_limit(&self, bucket: &str) -> RateLimiter {
        self.rate_limits
            .read()
            .await
            .get(bucket)
            .cloned()
            .unwrap_or_default()
    }

    /// Absolute URL for a REST path such as `/search/issues`
    pub fn rest_url(&self, path: &str) -> String {
        format!("{}{}", self.config.rest_base_url.trim_end_matches('/'), path)
    }

    /// Send `request`, retrying timeouts and gateway errors with increasing
    /// delay and sleeping through quota exhaustion. Never makes more than
    /// `max_attempts` attempts.
    pub async fn execute(&self, request: ApiRequest) -> GitHubResult<ApiResponse> {
        let policy = RetryPolicy::new(self.config.max_attempts, self.config.retry_base_delay);
        let mut last_failure = String::new();

        for attempt in 0..policy.max_attempts {
            if !self.config.request_delay.is_zero() {
                sleep(self.config.request_delay).await;
            }

            let response = match self.transport.send(request.clone()).await {
                Ok(response) => response,
                Err(TransportError::Timeout) => {
                    last_failure = TransportError::Timeout.to_string();
                    warn!(
                        "Timeout on {} (attempt {}/{})",
                        request.url,
                        attempt + 1,
                        policy.max_attempts
                    );
                    self.backoff(&policy, attempt).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let bucket = self.bucket_of(&request, &response.headers);
            self.rate_limits
                .write()
                .await
                .entry(bucket.clone())
                .or_default()
                .observe(&response.headers);

            if is_rate_limited_status(response.status, response.headers.rate_limit_remaining) {
                last_failure = format!("rate limited with status {}", response.status);
                if policy.has_next(attempt) {
                    let wait = self
                        .rate_limits
                        .read()
                        .await
                        .get(&bucket)
                        .and_then(|l| l.exhausted_wait(self.config.reset_margin, Utc::now()))
                        .unwrap_or(self.config.rate_limit_pause);
                    warn!(
                        "{bucket} rate limit hit, waiting {:.1} minutes",
                        wait.as_secs_f64() / 60.0
                    );
                    sleep(wait).await;
                }
                continue;
            }

            self.pause_if_quota_low(&bucket).await;

            if is_transient_status(response.status) {
                last_failure = format!("status {}", response.status);
                warn!(
                    "Status {} from {} (attempt {}/{})",
                    response.status,
                    request.url,
                    attempt + 1,
                    policy.max_attempts
                );
                self.backoff(&policy, attempt).await;
                continue;
            }

            if response.is_success() {
                return Ok(response);
            }

            warn!("Status {}: {}", response.status, request.url);
            return Err(match response.status {
                404 => GitHubError::NotFound(request.url),
                status => GitHubError::Status {
                    status,
                    url: request.url,
                },
            });
        }

        warn!(
            "All {} attempts failed for {}",
            policy.max_attempts, request.url
        );
        Err(GitHubError::RetriesExhausted {
            attempts: policy.max_attempts,
            last: last_failure,
        })
    }

    /// POST a GraphQL document and decode its `data`.
    pub async fn graphql<D: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> GitHubResult<D> {
        let request = ApiRequest::graphql(self.config.graphql_url.clone(), query, variables);
        let response = self.execute(request).await?;
        let envelope: GraphQlResponse<D> = response.json()?;
        envelope.into_data()
    }

    async fn backoff(&self, policy: &RetryPolicy, attempt: u32) {
        if policy.has_next(attempt) {
            let delay = policy.delay_for(attempt);
            info!("Waiting {}s before retrying", delay.as_secs());
            sleep(delay).await;
        }
    }

    /// Bucket named by the response, else guessed from the URL
    fn bucket_of(&self, request: &ApiRequest, headers: &ResponseHeaders) -> String {
        if let Some(resource) = &headers.rate_limit_resource {
            return resource.clone();
        }
        let bucket = if request.url == self.config.graphql_url {
            "graphql"
        } else if request.url.contains("/search/") {
            "search"
        } else {
            CORE_BUCKET
        };
        bucket.to_string()
    }

    async fn pause_if_quota_low(&self, bucket: &str) {
        let (remaining, pause) = {
            let limits = self.rate_limits.read().await;
            let Some(limiter) = limits.get(bucket) else {
                return;
            };
            (
                limiter.remaining,
                limiter.preventive_pause(
                    self.config.rate_limit_threshold,
                    self.config.rate_limit_pause,
                    self.config.reset_margin,
                    Utc::now(),
                ),
            )
        };

        match (remaining, pause) {
            (Some(remaining), Some(pause)) => {
                warn!(
                    "Only {remaining} {bucket} requests left, pausing {:.1} minutes",
                    pause.as_secs_f64() / 60.0
                );
                sleep(pause).await;
                info!("Resuming collection");
            }
            (Some(remaining), None) if remaining % 500 == 0 => {
                debug!("Rate limit: {remaining} {bucket} requests remaining");
            }
            _ => {}
        }
    }
}
