//! Tests for the pull request job, end to end over a scripted transport.

use crate::support::{
    graphql_data, pr_node, pull_request_page, repository_node, scripted, search_page, status,
    test_config,
};
use github_harvest::harvest::pull_requests::{
    self, PullRequestJob, RepositoryOutcome, collect_repository_prs, fill_descriptions,
    find_repositories,
};
use github_harvest::harvest::{Checkpoint, PullRequestRecord, RepositoryCandidate};
use github_harvest::{HarvestConfig, Limits, Mode};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn config(dir: &Path) -> HarvestConfig {
    HarvestConfig {
        token: Some("test-token".to_string()),
        mode: Mode::Test,
        limits: Limits::for_mode(Mode::Test),
        data_dir: dir.to_path_buf(),
        fetch: test_config(),
    }
}

fn job(max_repositories: usize, max_prs_per_repo: usize) -> PullRequestJob {
    PullRequestJob {
        limits: Limits {
            max_repositories,
            max_prs_per_repo,
            min_prs: 100,
        },
        fetch_descriptions: true,
    }
}

fn candidate(full_name: &str) -> RepositoryCandidate {
    let (owner, name) = full_name.split_once('/').unwrap();
    RepositoryCandidate {
        name: name.to_string(),
        full_name: full_name.to_string(),
        owner: owner.to_string(),
        stars: 10,
        forks: 1,
        language: "Unknown".to_string(),
        created_at: "2020-01-01T00:00:00Z".parse().unwrap(),
        url: format!("https://github.com/{full_name}"),
        total_prs: 1000,
    }
}

#[tokio::test(start_paused = true)]
async fn test_find_repositories_applies_minimum_and_cap() {
    let client = scripted([search_page(
        vec![
            repository_node("a/one", 500),
            repository_node("b/two", 99),
            repository_node("c/three", 100),
            repository_node("d/four", 900),
        ],
        Some("next"),
    )]);

    let found = find_repositories(&client, 2, 100).await;

    let names: Vec<&str> = found.iter().map(|r| r.full_name.as_str()).collect();
    assert_eq!(names, vec!["a/one", "c/three"]);
    assert_eq!(found[0].owner, "a");
    assert_eq!(found[0].language, "Unknown");
    assert_eq!(client.transport().calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_collect_repository_prs_filters_and_pages() {
    let client = scripted([
        pull_request_page(vec![pr_node(1, 0), pr_node(2, 1)], Some("p2")),
        pull_request_page(vec![pr_node(3, 4), pr_node(4, 1), pr_node(5, 1)], Some("p3")),
    ]);

    let outcome = collect_repository_prs(&client, &candidate("octo/demo"), 3).await;

    let RepositoryOutcome::Collected(records) = outcome else {
        panic!("expected records, got {outcome:?}");
    };
    let numbers: Vec<u64> = records.iter().map(|r| r.pr_number).collect();
    assert_eq!(numbers, vec![2, 3, 4]);
    assert!(records.iter().all(|r| r.repository == "octo/demo"));
    assert_eq!(client.transport().calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_first_page_failure_is_a_communication_error() {
    let client = scripted([status(502), status(502), status(502)]);

    let outcome = collect_repository_prs(&client, &candidate("octo/demo"), 10).await;

    assert!(matches!(outcome, RepositoryOutcome::CommunicationError(_)));
}

#[tokio::test(start_paused = true)]
async fn test_fill_descriptions_batches_per_repository() {
    let mut records: Vec<PullRequestRecord> = Vec::new();
    for (repo, number) in [("a/x", 1), ("b/y", 1), ("a/x", 2)] {
        let node = serde_json::from_value(pr_node(number, 1)).unwrap();
        records.push(github_harvest::harvest::metrics::pull_request_record(node, repo).unwrap());
    }
    let client = scripted([
        graphql_data(json!({ "repository": {
            "pr0": { "number": 1, "body": "first" },
            "pr1": { "number": 2, "body": "second one" }
        }})),
        graphql_data(json!({ "repository": { "pr0": { "number": 1, "body": "y" } } })),
    ]);

    fill_descriptions(&client, &mut records).await;

    let lengths: Vec<(&str, u64, Option<usize>)> = records
        .iter()
        .map(|r| (r.repository.as_str(), r.pr_number, r.description_length))
        .collect();
    assert_eq!(
        lengths,
        vec![("a/x", 1, Some(5)), ("b/y", 1, Some(1)), ("a/x", 2, Some(10))]
    );

    let requests = client.transport().requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].body.as_ref().unwrap()["variables"]["owner"], "a");
    assert_eq!(requests[1].body.as_ref().unwrap()["variables"]["name"], "y");
}

#[tokio::test(start_paused = true)]
async fn test_failed_description_batch_is_retried_later() {
    let mut records: Vec<PullRequestRecord> = Vec::new();
    for number in [1, 2] {
        let node = serde_json::from_value(pr_node(number, 1)).unwrap();
        records.push(github_harvest::harvest::metrics::pull_request_record(node, "a/x").unwrap());
    }
    records[0].description_length = Some(0);

    let failing = scripted([status(401)]);
    fill_descriptions(&failing, &mut records).await;
    assert_eq!(records[1].description_length, None);

    let client = scripted([graphql_data(json!({ "repository": {
        "pr0": { "number": 2, "body": "later" }
    }}))]);
    fill_descriptions(&client, &mut records).await;

    assert_eq!(records[0].description_length, Some(0));
    assert_eq!(records[1].description_length, Some(5));
    let requests = client.transport().requests();
    let query = requests[0].body.as_ref().unwrap()["query"].as_str().unwrap().to_string();
    assert!(query.contains("pr0: pullRequest(number: 2)"));
    assert!(!query.contains("pr1:"));
}

#[tokio::test(start_paused = true)]
async fn test_run_collects_checkpoints_and_writes_outputs() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let client = scripted([
        // phase 1
        search_page(
            vec![
                repository_node("a/one", 500),
                repository_node("b/two", 5),
                repository_node("c/three", 150),
            ],
            None,
        ),
        // phase 2: a/one, then c/three fails outright
        pull_request_page(
            vec![pr_node(1, 1), pr_node(2, 0), pr_node(3, 2), pr_node(4, 1)],
            Some("more"),
        ),
        status(401),
        // phase 3
        graphql_data(json!({ "repository": {
            "pr0": { "number": 1, "body": "hello" },
            "pr1": { "number": 3, "body": null }
        }})),
    ]);

    let report = pull_requests::run(&client, &config, &job(2, 2)).await.unwrap();

    assert_eq!(report.records, 2);
    assert_eq!(report.completed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.resumed, 0);
    assert_eq!(report.outputs.len(), 3);
    assert!(report.outputs.iter().all(|path| path.exists()));
    assert_eq!(client.transport().remaining(), 0);

    let checkpoint: Checkpoint<PullRequestRecord> =
        Checkpoint::load(&config.checkpoint_path(pull_requests::JOB_NAME));
    assert!(checkpoint.is_done("a/one"));
    assert!(!checkpoint.is_done("c/three"), "failed repositories are retried on resume");
    let described: Vec<(u64, Option<usize>)> = checkpoint
        .records
        .iter()
        .map(|r| (r.pr_number, r.description_length))
        .collect();
    assert_eq!(described, vec![(1, Some(5)), (3, Some(0))]);
    assert!(config.checkpoint_csv_path(pull_requests::JOB_NAME).exists());

    let final_json = report
        .outputs
        .iter()
        .find(|p| p.to_string_lossy().contains("lab03_test_final_"))
        .unwrap();
    let saved: Vec<PullRequestRecord> =
        serde_json::from_str(&std::fs::read_to_string(final_json).unwrap()).unwrap();
    assert_eq!(saved, checkpoint.records);
}

#[tokio::test(start_paused = true)]
async fn test_run_resumes_from_checkpoint() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());

    let node = serde_json::from_value(pr_node(9, 1)).unwrap();
    let mut record = github_harvest::harvest::metrics::pull_request_record(node, "a/one").unwrap();
    record.description_length = Some(0);
    let mut previous = Checkpoint::new();
    previous.complete("a/one", [record]);
    previous
        .save(&config.checkpoint_path(pull_requests::JOB_NAME), None)
        .unwrap();

    let client = scripted([search_page(vec![repository_node("a/one", 500)], None)]);

    let report = pull_requests::run(&client, &config, &job(1, 5)).await.unwrap();

    assert_eq!(report.resumed, 1);
    assert_eq!(report.completed, 0);
    assert_eq!(report.records, 1);
    assert_eq!(
        client.transport().calls(),
        1,
        "only the repository search; an empty description is not fetched again"
    );
}
