//! Tests for checkpoint persistence and resume bookkeeping.

use chrono::{TimeZone, Utc};
use github_harvest::harvest::{Checkpoint, PrStatus, PullRequestRecord};
use std::fs;
use tempfile::TempDir;

fn record(repository: &str, number: u64) -> PullRequestRecord {
    PullRequestRecord {
        repository: repository.to_string(),
        pr_number: number,
        title: format!("Change #{number}, with \"quotes\""),
        status: if number % 2 == 0 {
            PrStatus::Merged
        } else {
            PrStatus::Closed
        },
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        closed_at: Utc.with_ymd_and_hms(2024, 1, 3, 6, 30, 0).unwrap(),
        merged_at: None,
        files_changed: 3,
        additions: 10,
        deletions: 4,
        total_changes: 14,
        num_commits: 2,
        num_reviews: 1,
        num_comments: 0,
        analysis_time_hours: 54.5,
        author: "octocat".to_string(),
        description_length: Some(120),
    }
}

#[test]
fn test_round_trip_preserves_records_and_units() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checkpoint_pulls_test.json");

    let mut checkpoint = Checkpoint::new();
    checkpoint.complete("octo/demo", [record("octo/demo", 1), record("octo/demo", 2)]);
    checkpoint.complete("octo/empty", Vec::new());
    checkpoint.save(&path, None).unwrap();

    let loaded: Checkpoint<PullRequestRecord> = Checkpoint::load(&path);

    assert_eq!(loaded.records, checkpoint.records);
    assert_eq!(loaded.processed_repos, checkpoint.processed_repos);
    assert_eq!(loaded.total_records, 2);
    assert_eq!(loaded.total_units, 2);
    assert!(loaded.timestamp.is_some());
    assert!(loaded.is_done("octo/empty"));
    assert!(!loaded.is_done("octo/other"));
}

#[test]
fn test_missing_file_loads_empty() {
    let dir = TempDir::new().unwrap();

    let loaded: Checkpoint<PullRequestRecord> = Checkpoint::load(&dir.path().join("none.json"));

    assert!(loaded.records.is_empty());
    assert!(loaded.processed_repos.is_empty());
    assert_eq!(loaded.total_units, 0);
}

#[test]
fn test_corrupt_file_loads_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checkpoint.json");
    fs::write(&path, "{ \"records\": [ {\"truncated\"").unwrap();

    let loaded: Checkpoint<PullRequestRecord> = Checkpoint::load(&path);

    assert!(loaded.records.is_empty());
    assert!(loaded.processed_repos.is_empty());
    assert_eq!(loaded.total_units, 0);
}

#[test]
fn test_save_overwrites_and_writes_csv_sidecar() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("checkpoint.json");
    let csv = dir.path().join("nested").join("checkpoint.csv");

    let mut checkpoint = Checkpoint::new();
    checkpoint.complete("a/b", [record("a/b", 1)]);
    checkpoint.save(&path, Some(&csv)).unwrap();
    checkpoint.complete("c/d", [record("c/d", 2)]);
    checkpoint.save(&path, Some(&csv)).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["total_records"], 2);
    assert_eq!(json["processed_repos"], serde_json::json!(["a/b", "c/d"]));

    let text = fs::read_to_string(&csv).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "repository,pr_number,title,status,created_at,closed_at,merged_at,files_changed,additions,deletions,total_changes,num_commits,num_reviews,num_comments,analysis_time_hours,author,description_length"
    );
    assert_eq!(lines.count(), 2);

    let leftovers: Vec<_> = fs::read_dir(dir.path().join("nested"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 2, "no temporary files left behind: {leftovers:?}");
}

#[test]
fn test_resumed_checkpoint_skips_completed_units() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checkpoint.json");
    let mut first_run = Checkpoint::new();
    first_run.complete("a/done", [record("a/done", 1)]);
    first_run.save(&path, None).unwrap();

    let mut second_run: Checkpoint<PullRequestRecord> = Checkpoint::load(&path);
    let pending: Vec<&str> = ["a/done", "b/todo"]
        .into_iter()
        .filter(|unit| !second_run.is_done(unit))
        .collect();
    assert_eq!(pending, vec!["b/todo"]);

    second_run.complete("b/todo", [record("b/todo", 5)]);
    assert_eq!(second_run.records.len(), 2);
    assert_eq!(second_run.total_units, 2);
}
