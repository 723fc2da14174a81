//! `github_harvest` - GitHub repository and pull request harvesting
//!
//! This library collects repository and pull-request metadata from the GitHub
//! REST and GraphQL APIs for offline analysis. All requests go through a
//! retrying, rate-limit aware client; every collection job checkpoints after
//! each repository so an interrupted run resumes where it stopped.

// Module declarations
pub mod config;
pub mod error;
pub mod experiment;
pub mod github;
pub mod harvest;

// Re-export configuration types
pub use config::{HarvestConfig, Limits, Mode};

// Re-export error types
pub use error::{HarvestError, HarvestResult};
pub use github::{GitHubError, GitHubResult};

// Re-export GitHub client types
pub use github::{ApiClient, FetchConfig, GitHubClient, GitHubClientBuilder, HttpTransport};

// Re-export records and jobs
pub use harvest::{Checkpoint, JobReport, PullRequestRecord, RepositoryRecord};
