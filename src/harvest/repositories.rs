//! `repos` job: most-starred repositories with activity counts

use chrono::Utc;
use log::{error, info, warn};

use crate::config::HarvestConfig;
use crate::error::HarvestResult;
use crate::github::rest::{self, RepositorySearch, RestRepository};
use crate::github::{ApiClient, GitHubResult, Termination, Transport, collect_pages};
use crate::harvest::checkpoint::Checkpoint;
use crate::harvest::export::{write_csv, write_json};
use crate::harvest::metrics::repository_record;
use crate::harvest::model::{RepositoryCounts, RepositoryRecord};
use crate::harvest::stats::RepositorySummary;
use crate::harvest::JobReport;

/// Checkpoint name of this job
pub const JOB_NAME: &str = "repos";

/// Final dataset file stem under the data directory
pub const OUTPUT_STEM: &str = "repositorios_dados";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryJob {
    /// Number of repositories to collect
    pub limit: usize,
    pub language: Option<String>,
}

impl Default for RepositoryJob {
    fn default() -> Self {
        Self {
            limit: 100,
            language: None,
        }
    }
}

/// Search qualifier for popular repositories, optionally in one language
pub fn search_query(language: Option<&str>) -> String {
    match language.map(str::trim).filter(|l| !l.is_empty()) {
        Some(language) => format!("stars:>1 language:{language}"),
        None => "stars:>1".to_string(),
    }
}

/// Merged pull requests, releases and closed issues of one repository.
///
/// A failing count is logged and reported as 0.
pub async fn repository_counts<T: Transport>(
    client: &ApiClient<T>,
    owner: &str,
    name: &str,
) -> RepositoryCounts {
    let repo = format!("{owner}/{name}");

    let merged_prs = rest::search_total_count(client, &format!("repo:{repo} type:pr is:merged"))
        .await
        .unwrap_or_else(|e| {
            warn!("Merged PR count of {repo} unavailable: {e}");
            0
        });
    let total_releases = rest::count_releases(client, owner, name)
        .await
        .unwrap_or_else(|e| {
            warn!("Release count of {repo} unavailable: {e}");
            0
        });
    let closed_issues =
        rest::search_total_count(client, &format!("repo:{repo} type:issue state:closed"))
            .await
            .unwrap_or_else(|e| {
                warn!("Closed issue count of {repo} unavailable: {e}");
                0
            });

    RepositoryCounts {
        merged_prs,
        total_releases,
        closed_issues,
    }
}

/// Details plus counts for one search hit
pub async fn collect_repository<T: Transport>(
    client: &ApiClient<T>,
    hit: &RestRepository,
) -> GitHubResult<RepositoryRecord> {
    let details = rest::get_repository(client, &hit.owner.login, &hit.name).await?;
    let counts = repository_counts(client, &details.owner.login, &details.name).await;
    Ok(repository_record(&details, counts, Utc::now()))
}

pub async fn run<T: Transport>(
    client: &ApiClient<T>,
    config: &HarvestConfig,
    job: &RepositoryJob,
) -> HarvestResult<JobReport> {
    let checkpoint_path = config.checkpoint_path(JOB_NAME);
    let checkpoint_csv = config.checkpoint_csv_path(JOB_NAME);
    let mut checkpoint: Checkpoint<RepositoryRecord> = Checkpoint::load(&checkpoint_path);
    let mut report = JobReport::default();

    let query = search_query(job.language.as_deref());
    let per_page = job.limit.clamp(1, usize::from(client.config().page_size)) as u8;
    info!("Searching the {} most starred repositories ({query})", job.limit);

    let mut search = RepositorySearch::new(client, query, per_page);
    let found = collect_pages(&mut search, job.limit, Some).await;
    if let Termination::Failed(reason) = &found.termination {
        warn!("Repository search stopped early: {reason}");
    }
    if found.items.is_empty() {
        warn!("No repositories collected");
        return Ok(report);
    }
    info!(
        "Found {} repositories, collecting details",
        found.items.len()
    );

    let total = found.items.len();
    for (i, hit) in found.items.iter().enumerate() {
        if checkpoint.is_done(&hit.full_name) {
            report.resumed += 1;
            continue;
        }
        info!("[{}/{total}] {}", i + 1, hit.full_name);

        match collect_repository(client, hit).await {
            Ok(record) => {
                info!("  {}/{} - {} stars", record.owner, record.name, record.stars);
                checkpoint.complete(hit.full_name.clone(), [record]);
                report.completed += 1;
            }
            Err(e) => {
                warn!("Skipping {}: {e}", hit.full_name);
                report.failed += 1;
                continue;
            }
        }

        if let Err(e) = checkpoint.save(&checkpoint_path, Some(&checkpoint_csv)) {
            error!("Checkpoint not saved: {e}");
        }
    }

    let json_path = config.data_dir.join(format!("{OUTPUT_STEM}.json"));
    let csv_path = config.data_dir.join(format!("{OUTPUT_STEM}.csv"));
    write_json(&json_path, &checkpoint.records)?;
    write_csv(&csv_path, &checkpoint.records)?;
    info!("Data saved to {}", json_path.display());

    if let Some(summary) = RepositorySummary::from_records(&checkpoint.records) {
        log_summary(&summary);
    }

    report.records = checkpoint.records.len();
    report.outputs = vec![json_path, csv_path];
    Ok(report)
}

fn log_summary(summary: &RepositorySummary) {
    info!("Repositories collected: {}", summary.count);
    info!("Total stars: {}", summary.total_stars);
    info!(
        "Mean age: {:.1} days ({:.1} years)",
        summary.mean_age_days,
        summary.mean_age_days / 365.0
    );
    info!("Most common languages:");
    for share in &summary.top_languages {
        info!(
            "  {}: {} repositories ({:.1}%)",
            share.language, share.count, share.percentage
        );
    }
}
