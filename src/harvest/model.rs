//! Records written by the collection jobs
//!
//! Field order of each record is the column order of its CSV export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One popular repository with its activity counts (`repos` job)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub name: String,
    pub owner: String,
    pub url: String,
    pub stars: u64,
    pub age_days: i64,
    pub merged_prs: u64,
    pub total_releases: u64,
    pub days_since_update: i64,
    pub primary_language: String,
    /// Open plus closed issues
    pub total_issues: u64,
    pub closed_issues: u64,
    pub closed_issues_ratio: f64,
    pub forks: u64,
    pub description: String,
}

/// Counts gathered with extra requests per repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryCounts {
    pub merged_prs: u64,
    pub total_releases: u64,
    pub closed_issues: u64,
}

/// Repository found by the GraphQL search of the `pulls` job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryCandidate {
    pub name: String,
    pub full_name: String,
    pub owner: String,
    pub stars: u64,
    pub forks: u64,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
    /// Closed plus merged pull requests
    pub total_prs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrStatus {
    Merged,
    Closed,
}

impl PrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrStatus::Merged => "MERGED",
            PrStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reviewed pull request (`pulls` job)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    /// `owner/name`
    pub repository: String,
    pub pr_number: u64,
    pub title: String,
    pub status: PrStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub files_changed: u64,
    pub additions: u64,
    pub deletions: u64,
    pub total_changes: u64,
    pub num_commits: u64,
    pub num_reviews: u64,
    pub num_comments: u64,
    pub analysis_time_hours: f64,
    pub author: String,
    /// Body length in characters; `None` until the description phase has
    /// fetched it
    #[serde(default)]
    pub description_length: Option<usize>,
}
