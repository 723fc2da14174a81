//! `pulls` job: reviewed pull requests of busy repositories
//!
//! Runs in four phases:
//!
//! 1. GraphQL repository search for repositories with enough closed or
//!    merged pull requests
//! 2. up to `max_prs_per_repo` reviewed pull requests per repository, with a
//!    checkpoint after each one
//! 3. description lengths, fetched in aliased batches
//! 4. final dataset and statistics

use chrono::Local;
use log::{error, info, warn};
use std::collections::HashMap;

use crate::config::{HarvestConfig, Limits};
use crate::error::HarvestResult;
use crate::github::graphql::{PullRequestSource, RepositorySearchSource, fetch_description_lengths};
use crate::github::{ApiClient, StopReason, Termination, Transport, collect_pages};
use crate::harvest::JobReport;
use crate::harvest::checkpoint::Checkpoint;
use crate::harvest::export::{timestamped_name, write_csv, write_json};
use crate::harvest::metrics::{pull_request_record, repository_candidate};
use crate::harvest::model::{PullRequestRecord, RepositoryCandidate};
use crate::harvest::stats::PullRequestStats;

/// Checkpoint name of this job
pub const JOB_NAME: &str = "pulls";

pub const REPOSITORY_SEARCH: &str = "stars:>1";

/// Pull requests per description query
pub const DESCRIPTION_BATCH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestJob {
    pub limits: Limits,
    pub fetch_descriptions: bool,
}

/// How collecting one repository went
#[derive(Debug, Clone, PartialEq)]
pub enum RepositoryOutcome {
    /// Valid pull requests, possibly none
    Collected(Vec<PullRequestRecord>),
    /// The first page already failed, so nothing is known about the repository
    CommunicationError(StopReason),
}

/// Phase 1: up to `max` repositories with at least `min_prs` closed or merged
/// pull requests.
pub async fn find_repositories<T: Transport>(
    client: &ApiClient<T>,
    max: usize,
    min_prs: u64,
) -> Vec<RepositoryCandidate> {
    info!("Phase 1: searching {max} repositories with at least {min_prs} pull requests");
    let mut search = RepositorySearchSource::new(client, REPOSITORY_SEARCH);
    let found = collect_pages(&mut search, max, |node| repository_candidate(node, min_prs)).await;

    match &found.termination {
        Termination::Failed(reason) => warn!("Repository search stopped early: {reason}"),
        Termination::LastPage | Termination::EmptyPage if found.items.len() < max => {
            info!("Search exhausted after {} pages", found.pages)
        }
        _ => {}
    }
    info!(
        "Found {} valid repositories out of {} searched",
        found.items.len(),
        found.examined
    );
    found.items
}

/// Phase 2 for one repository
pub async fn collect_repository_prs<T: Transport>(
    client: &ApiClient<T>,
    repo: &RepositoryCandidate,
    max_prs: usize,
) -> RepositoryOutcome {
    info!(
        "Repository {}: {} stars, {} pull requests",
        repo.full_name, repo.stars, repo.total_prs
    );

    let mut source = PullRequestSource::new(client, &repo.owner, &repo.name);
    let collected = collect_pages(&mut source, max_prs, |node| {
        pull_request_record(node, &repo.full_name)
    })
    .await;

    if collected.failed_on_first_page()
        && let Termination::Failed(reason) = collected.termination
    {
        warn!(
            "0 pull requests collected from {} because of a communication error: {reason}",
            repo.full_name
        );
        return RepositoryOutcome::CommunicationError(reason);
    }

    if collected.items.is_empty() {
        info!(
            "No pull request of {} met the criteria (over 1h of analysis and at least one review)",
            repo.full_name
        );
    } else {
        info!(
            "{} valid pull requests out of {} processed",
            collected.items.len(),
            collected.examined
        );
    }
    RepositoryOutcome::Collected(collected.items)
}

/// Phase 3: fill `description_length` of every record not fetched yet
pub async fn fill_descriptions<T: Transport>(
    client: &ApiClient<T>,
    records: &mut [PullRequestRecord],
) {
    let mut by_repository: Vec<(String, Vec<u64>)> = Vec::new();
    for record in records.iter().filter(|r| r.description_length.is_none()) {
        match by_repository
            .iter_mut()
            .find(|(repo, _)| *repo == record.repository)
        {
            Some((_, numbers)) => numbers.push(record.pr_number),
            None => by_repository.push((record.repository.clone(), vec![record.pr_number])),
        }
    }
    info!(
        "Phase 3: fetching descriptions for {} repositories",
        by_repository.len()
    );

    let mut lengths: HashMap<(String, u64), usize> = HashMap::new();
    for (i, (repository, numbers)) in by_repository.iter().enumerate() {
        let Some((owner, name)) = repository.split_once('/') else {
            warn!("Malformed repository name {repository}, skipping descriptions");
            continue;
        };
        info!(
            "[{}/{}] {repository} ({} pull requests)",
            i + 1,
            by_repository.len(),
            numbers.len()
        );

        for (batch, chunk) in numbers.chunks(DESCRIPTION_BATCH).enumerate() {
            let found = fetch_description_lengths(client, owner, name, chunk).await;
            info!("  Batch {} - {} pull requests", batch + 1, chunk.len());
            lengths.extend(
                found
                    .into_iter()
                    .map(|(number, length)| ((repository.clone(), number), length)),
            );
        }
    }

    for record in records.iter_mut() {
        if let Some(length) = lengths.get(&(record.repository.clone(), record.pr_number)) {
            record.description_length = Some(*length);
        }
    }
    info!(
        "Descriptions collected: {}",
        records.iter().filter(|r| r.description_length.is_some()).count()
    );
}

pub async fn run<T: Transport>(
    client: &ApiClient<T>,
    config: &HarvestConfig,
    job: &PullRequestJob,
) -> HarvestResult<JobReport> {
    let checkpoint_path = config.checkpoint_path(JOB_NAME);
    let checkpoint_csv = config.checkpoint_csv_path(JOB_NAME);
    let mut checkpoint: Checkpoint<PullRequestRecord> = Checkpoint::load(&checkpoint_path);
    let mut report = JobReport::default();
    let limits = job.limits;

    let repositories =
        find_repositories(client, limits.max_repositories, limits.min_prs).await;
    if repositories.is_empty() && checkpoint.records.is_empty() {
        warn!("No repositories found");
        return Ok(report);
    }

    let remaining: Vec<&RepositoryCandidate> = repositories
        .iter()
        .filter(|r| !checkpoint.is_done(&r.full_name))
        .collect();
    report.resumed = repositories.len() - remaining.len();
    info!(
        "Phase 2: {} of {} repositories left to process, up to {} pull requests each",
        remaining.len(),
        repositories.len(),
        limits.max_prs_per_repo
    );

    for (i, repo) in remaining.iter().enumerate() {
        info!(
            "[{}/{}] Collecting {}",
            report.resumed + i + 1,
            repositories.len(),
            repo.full_name
        );

        match collect_repository_prs(client, repo, limits.max_prs_per_repo).await {
            RepositoryOutcome::Collected(records) => {
                let count = records.len();
                checkpoint.complete(repo.full_name.clone(), records);
                report.completed += 1;
                info!(
                    "  {count} pull requests collected, {} in total",
                    checkpoint.records.len()
                );
            }
            RepositoryOutcome::CommunicationError(_) => report.failed += 1,
        }

        if let Err(e) = checkpoint.save(&checkpoint_path, Some(&checkpoint_csv)) {
            error!("Checkpoint not saved: {e}");
        }
    }

    if checkpoint.records.is_empty() {
        warn!("No valid pull request collected");
        return Ok(report);
    }

    if job.fetch_descriptions {
        fill_descriptions(client, &mut checkpoint.records).await;
        if let Err(e) = checkpoint.save(&checkpoint_path, Some(&checkpoint_csv)) {
            error!("Checkpoint not saved: {e}");
        }
    }

    info!("Phase 4: saving final dataset");
    let now = Local::now().naive_local();
    let json_path = config
        .data_dir
        .join(timestamped_name("lab03", config.mode, "_final", "json", now));
    let csv_path = config
        .data_dir
        .join(timestamped_name("lab03", config.mode, "_final", "csv", now));
    write_json(&json_path, &checkpoint.records)?;
    write_csv(&csv_path, &checkpoint.records)?;
    info!("JSON: {}", json_path.display());
    info!("CSV: {}", csv_path.display());
    report.outputs = vec![json_path, csv_path];

    if let Some(stats) = PullRequestStats::from_records(&checkpoint.records) {
        let stats_path = config
            .data_dir
            .join(timestamped_name("lab03", config.mode, "_stats", "json", now));
        write_json(&stats_path, &stats)?;
        info!("Pull requests collected: {}", stats.total_prs);
        info!("Repositories: {}", stats.repositories_count);
        info!("Merged: {}", stats.merged_prs);
        info!("Closed: {}", stats.closed_prs);
        info!(
            "Mean analysis time: {:.1}h",
            stats.metrics.analysis_time_hours.mean
        );
        report.outputs.push(stats_path);
    }

    report.records = checkpoint.records.len();
    Ok(report)
}
