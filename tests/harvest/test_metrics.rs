//! Tests for derived metrics and the pull request filter.

use chrono::{DateTime, Duration, TimeZone, Utc};
use github_harvest::github::graphql::{Login, PullRequestNode, TotalCount};
use github_harvest::harvest::PrStatus;
use github_harvest::harvest::metrics::{
    age_days, analysis_time_hours, closed_issues_ratio, days_since, pull_request_record,
};

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
}

fn node(created: DateTime<Utc>, closed: Option<DateTime<Utc>>, reviews: u64) -> PullRequestNode {
    PullRequestNode {
        number: 12,
        title: "Add parser".to_string(),
        state: "CLOSED".to_string(),
        created_at: created,
        closed_at: closed,
        merged_at: None,
        additions: 30,
        deletions: 12,
        changed_files: 4,
        commits: TotalCount { total_count: 2 },
        reviews: TotalCount {
            total_count: reviews,
        },
        comments: TotalCount { total_count: 5 },
        author: Some(Login {
            login: "octocat".to_string(),
        }),
    }
}

#[test]
fn test_closed_issues_ratio_with_no_issues_is_zero() {
    assert_eq!(closed_issues_ratio(0, 0), 0.0);
    assert_eq!(closed_issues_ratio(0, 4), 1.0);
    assert_eq!(closed_issues_ratio(1, 3), 0.75);
}

#[test]
fn test_equal_timestamps_give_zero_hours() {
    assert_eq!(analysis_time_hours(at(9), at(9)), 0.0);
    assert_eq!(analysis_time_hours(at(9), at(12)), 3.0);
    assert_eq!(
        analysis_time_hours(at(9), at(9) + Duration::minutes(90)),
        1.5
    );
}

#[test]
fn test_day_counts_never_go_negative() {
    let now = at(12);
    assert_eq!(age_days(now - Duration::days(400), now), 400);
    assert_eq!(days_since(now - Duration::hours(30), now), 1);
    assert_eq!(days_since(now + Duration::days(2), now), 0);
    assert_eq!(age_days(now + Duration::days(2), now), 0);
}

#[test]
fn test_reviewed_pull_request_becomes_a_record() {
    let record = pull_request_record(node(at(8), Some(at(11)), 1), "octo/demo").unwrap();

    assert_eq!(record.repository, "octo/demo");
    assert_eq!(record.pr_number, 12);
    assert_eq!(record.status, PrStatus::Closed);
    assert_eq!(record.total_changes, 42);
    assert_eq!(record.files_changed, 4);
    assert_eq!(record.num_commits, 2);
    assert_eq!(record.num_reviews, 1);
    assert_eq!(record.num_comments, 5);
    assert_eq!(record.analysis_time_hours, 3.0);
    assert_eq!(record.author, "octocat");
    assert_eq!(record.description_length, None);
}

#[test]
fn test_merged_pull_request_status() {
    let mut merged = node(at(8), Some(at(11)), 1);
    merged.merged_at = Some(at(11));

    let record = pull_request_record(merged, "octo/demo").unwrap();

    assert_eq!(record.status, PrStatus::Merged);
    assert_eq!(record.merged_at, Some(at(11)));
}

#[test]
fn test_filter_rejections() {
    assert!(pull_request_record(node(at(8), None, 3), "r").is_none(), "never closed");
    assert!(
        pull_request_record(node(at(8), Some(at(9)), 3), "r").is_none(),
        "exactly one hour is too quick"
    );
    assert!(
        pull_request_record(node(at(8), Some(at(8) + Duration::minutes(61)), 3), "r").is_some()
    );
    assert!(pull_request_record(node(at(8), Some(at(12)), 0), "r").is_none(), "no review");
}

#[test]
fn test_missing_author_is_unknown() {
    let mut ghost = node(at(1), Some(at(5)), 1);
    ghost.author = None;

    assert_eq!(pull_request_record(ghost, "r").unwrap().author, "unknown");
}
