//! Derived metrics and record construction

use chrono::{DateTime, Utc};

use crate::github::graphql::{PullRequestNode, RepositoryNode};
use crate::github::rest::RestRepository;
use crate::harvest::model::{
    PrStatus, PullRequestRecord, RepositoryCandidate, RepositoryCounts, RepositoryRecord,
};

/// Pull requests closed within this many hours are treated as unreviewed
pub const MIN_ANALYSIS_HOURS: f64 = 1.0;

/// Author shown for deleted accounts
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Language shown when GitHub reports none
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

/// `closed / (open + closed)`, 0.0 when there are no issues at all
pub fn closed_issues_ratio(open: u64, closed: u64) -> f64 {
    let total = open + closed;
    if total == 0 {
        0.0
    } else {
        closed as f64 / total as f64
    }
}

/// Hours between creation and closing
pub fn analysis_time_hours(created: DateTime<Utc>, closed: DateTime<Utc>) -> f64 {
    (closed - created).num_milliseconds() as f64 / 3_600_000.0
}

/// Whole days since `created`, never negative
pub fn age_days(created: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created).num_days().max(0)
}

/// Whole days since `updated`, never negative
pub fn days_since(updated: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - updated).num_days().max(0)
}

/// Turn a GraphQL pull request into a record, or reject it.
///
/// Rejected when it was never closed, when it was closed within
/// [`MIN_ANALYSIS_HOURS`], or when nobody reviewed it.
pub fn pull_request_record(node: PullRequestNode, repository: &str) -> Option<PullRequestRecord> {
    let closed_at = node.closed_at?;
    let hours = analysis_time_hours(node.created_at, closed_at);
    if hours <= MIN_ANALYSIS_HOURS || node.reviews.total_count == 0 {
        return None;
    }

    Some(PullRequestRecord {
        repository: repository.to_string(),
        pr_number: node.number,
        title: node.title,
        status: if node.merged_at.is_some() {
            PrStatus::Merged
        } else {
            PrStatus::Closed
        },
        created_at: node.created_at,
        closed_at,
        merged_at: node.merged_at,
        files_changed: node.changed_files,
        additions: node.additions,
        deletions: node.deletions,
        total_changes: node.additions + node.deletions,
        num_commits: node.commits.total_count,
        num_reviews: node.reviews.total_count,
        num_comments: node.comments.total_count,
        analysis_time_hours: hours,
        author: node
            .author
            .map(|a| a.login)
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        description_length: None,
    })
}

/// Search hit with at least `min_prs` closed or merged pull requests
pub fn repository_candidate(node: RepositoryNode, min_prs: u64) -> Option<RepositoryCandidate> {
    if node.pull_requests.total_count < min_prs {
        return None;
    }
    Some(RepositoryCandidate {
        name: node.name,
        full_name: node.name_with_owner,
        owner: node.owner.login,
        stars: node.stargazer_count,
        forks: node.fork_count,
        language: node
            .primary_language
            .map(|l| l.name)
            .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()),
        created_at: node.created_at,
        url: node.url,
        total_prs: node.pull_requests.total_count,
    })
}

pub fn repository_record(
    details: &RestRepository,
    counts: RepositoryCounts,
    now: DateTime<Utc>,
) -> RepositoryRecord {
    RepositoryRecord {
        name: details.name.clone(),
        owner: details.owner.login.clone(),
        url: details.html_url.clone(),
        stars: details.stargazers_count,
        age_days: age_days(details.created_at, now),
        merged_prs: counts.merged_prs,
        total_releases: counts.total_releases,
        days_since_update: days_since(details.updated_at, now),
        primary_language: details
            .language
            .clone()
            .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()),
        total_issues: details.open_issues_count + counts.closed_issues,
        closed_issues: counts.closed_issues,
        closed_issues_ratio: closed_issues_ratio(details.open_issues_count, counts.closed_issues),
        forks: details.forks_count,
        description: details.description.clone().unwrap_or_default(),
    }
}
