// Command line entry point for the GitHub harvesting jobs.
//
// Every job loads `config.env`, builds one retrying API client and runs to
// completion in this process. Ctrl-C abandons the job; the checkpoint saved
// after the last finished repository is what a rerun resumes from.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use github_harvest::config::DEFAULT_CONFIG_FILE;
use github_harvest::experiment::{self, ExperimentOptions};
use github_harvest::harvest::pull_requests::{self, PullRequestJob};
use github_harvest::harvest::repositories::{self, RepositoryJob};
use github_harvest::{
    ApiClient, Checkpoint, GitHubClient, HarvestConfig, HttpTransport, JobReport, Mode,
};

#[derive(Parser, Debug)]
#[command(name = "github-harvest", version, about)]
struct Cli {
    /// Environment file holding GITHUB_TOKEN and the mode limits
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Output directory (overrides DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Collection profile (overrides MODE)
    #[arg(long, global = true, value_enum)]
    mode: Option<Mode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Most starred repositories with release, PR and issue counts
    Repos {
        #[arg(long, default_value_t = 100)]
        limit: usize,
        #[arg(long)]
        language: Option<String>,
    },
    /// Reviewed pull requests of repositories with many closed PRs
    Pulls {
        #[arg(long)]
        max_repositories: Option<usize>,
        #[arg(long)]
        max_prs: Option<usize>,
        #[arg(long)]
        min_prs: Option<u64>,
        /// Leave description_length empty
        #[arg(long)]
        skip_descriptions: bool,
    },
    /// Time REST against GraphQL for the same queries
    Experiment {
        #[arg(long, default_value_t = 30)]
        repetitions: usize,
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },
    /// Show the remaining core and search quota
    Quota,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = HarvestConfig::load(&cli.config, cli.mode)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let token = config.require_token()?.to_string();

    let github = GitHubClient::with_token(token.clone()).context("building GitHub client")?;
    if let Command::Quota = cli.command {
        let quota = github.rate_limit_status().await?;
        println!("{}", serde_json::to_string_pretty(&quota)?);
        return Ok(());
    }
    match github.rate_limit_status().await {
        Ok(quota) => info!(
            "Quota: core {}/{} (reset {}), search {}/{}",
            quota.core.remaining,
            quota.core.limit,
            quota.core.reset,
            quota.search.remaining,
            quota.search.limit
        ),
        Err(e) => warn!("Could not read quota: {e}"),
    }

    let transport = HttpTransport::new(
        token,
        &config.fetch.user_agent,
        config.fetch.request_timeout,
    )
    .context("building HTTP client")?;
    let client = ApiClient::new(transport, config.fetch.clone());
    info!("Mode: {}, data directory: {}", config.mode, config.data_dir.display());

    match cli.command {
        Command::Repos { limit, language } => {
            let job = RepositoryJob { limit, language };
            let checkpoint = config.checkpoint_path(repositories::JOB_NAME);
            let outcome =
                interruptible(repositories::run(&client, &config, &job), || {
                    report_interrupted::<github_harvest::RepositoryRecord>(&checkpoint)
                })
                .await;
            finish(outcome)
        }
        Command::Pulls {
            max_repositories,
            max_prs,
            min_prs,
            skip_descriptions,
        } => {
            let mut limits = config.limits;
            limits.max_repositories = max_repositories.unwrap_or(limits.max_repositories);
            limits.max_prs_per_repo = max_prs.unwrap_or(limits.max_prs_per_repo);
            limits.min_prs = min_prs.unwrap_or(limits.min_prs);
            let job = PullRequestJob {
                limits,
                fetch_descriptions: !skip_descriptions,
            };
            let checkpoint = config.checkpoint_path(pull_requests::JOB_NAME);
            let outcome =
                interruptible(pull_requests::run(&client, &config, &job), || {
                    report_interrupted::<github_harvest::PullRequestRecord>(&checkpoint)
                })
                .await;
            finish(outcome)
        }
        Command::Experiment {
            repetitions,
            delay_ms,
        } => {
            let options = ExperimentOptions {
                repetitions,
                delay: Duration::from_millis(delay_ms),
            };
            tokio::select! {
                saved = experiment::run(&client, &config.data_dir, &options) => {
                    if saved?.is_none() {
                        warn!("Experiment produced no measurements");
                    }
                }
                _ = tokio::signal::ctrl_c() => warn!("Experiment interrupted, nothing saved"),
            }
            Ok(())
        }
        Command::Quota => Ok(()),
    }
}

/// Run `job` until it finishes or Ctrl-C arrives; `None` when interrupted.
async fn interruptible<F, T>(job: F, on_interrupt: impl FnOnce()) -> Option<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        result = job => Some(result),
        _ = tokio::signal::ctrl_c() => {
            on_interrupt();
            None
        }
    }
}

fn report_interrupted<R: serde::de::DeserializeOwned>(checkpoint: &std::path::Path) {
    let saved: Checkpoint<R> = Checkpoint::load(checkpoint);
    warn!("Interrupted by user");
    warn!(
        "Last checkpoint {}: {} records from {} repositories",
        checkpoint.display(),
        saved.records.len(),
        saved.processed_repos.len()
    );
}

fn finish(outcome: Option<github_harvest::HarvestResult<JobReport>>) -> Result<()> {
    let Some(result) = outcome else {
        return Ok(());
    };
    let report = result?;
    info!(
        "Done: {} records, {} repositories collected, {} resumed, {} failed",
        report.records, report.completed, report.resumed, report.failed
    );
    for path in &report.outputs {
        info!("  {}", path.display());
    }
    Ok(())
}
