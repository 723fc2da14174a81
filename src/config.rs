//! Job configuration: `config.env`, environment variables, mode limits

use log::{debug, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{HarvestError, HarvestResult};
use crate::github::FetchConfig;

/// Default file holding `GITHUB_TOKEN` and friends
pub const DEFAULT_CONFIG_FILE: &str = "config.env";

/// Collection size profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    #[default]
    Test,
    Production,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Test => "test",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Mode::Test),
            "production" | "prod" => Ok(Mode::Production),
            other => Err(HarvestError::Config(format!("unknown MODE '{other}'"))),
        }
    }
}

/// How much a job collects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_repositories: usize,
    pub max_prs_per_repo: usize,
    pub min_prs: u64,
}

impl Limits {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Test => Self {
                max_repositories: 3,
                max_prs_per_repo: 5,
                min_prs: 10,
            },
            Mode::Production => Self {
                max_repositories: 200,
                max_prs_per_repo: 500,
                min_prs: 100,
            },
        }
    }
}

/// Everything a collection job needs to know
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub token: Option<String>,
    pub mode: Mode,
    pub limits: Limits,
    pub data_dir: PathBuf,
    pub fetch: FetchConfig,
}

impl HarvestConfig {
    /// Load `config_file` (if present) into the environment, then read it.
    /// Variables already set in the environment win over the file; `mode`
    /// overrides `MODE`.
    pub fn load(config_file: &Path, mode: Option<Mode>) -> HarvestResult<Self> {
        match dotenv::from_filename(config_file) {
            Ok(path) => debug!("Loaded {}", path.display()),
            Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No {} found, using environment only", config_file.display());
            }
            Err(e) => warn!("Ignoring {}: {e}", config_file.display()),
        }
        Self::from_env(mode)
    }

    /// Read configuration from the process environment
    pub fn from_env(mode: Option<Mode>) -> HarvestResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), mode)
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        mode: Option<Mode>,
    ) -> HarvestResult<Self> {
        let mode = match (mode, lookup("MODE")) {
            (Some(mode), _) => mode,
            (None, Some(value)) => value.parse()?,
            (None, None) => Mode::default(),
        };

        let prefix = match mode {
            Mode::Test => "TEST",
            Mode::Production => "PROD",
        };
        let defaults = Limits::for_mode(mode);
        let limits = Limits {
            max_repositories: parse_var(
                &lookup,
                &format!("{prefix}_MAX_REPOSITORIES"),
                defaults.max_repositories,
            )?,
            max_prs_per_repo: parse_var(
                &lookup,
                &format!("{prefix}_MAX_PRS_PER_REPO"),
                defaults.max_prs_per_repo,
            )?,
            min_prs: parse_var(&lookup, &format!("{prefix}_MIN_PRS"), defaults.min_prs)?,
        };

        Ok(Self {
            token: lookup("GITHUB_TOKEN")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            mode,
            limits,
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            fetch: FetchConfig::default(),
        })
    }

    /// The token, or a configuration error naming where to put it
    pub fn require_token(&self) -> HarvestResult<&str> {
        self.token.as_deref().ok_or_else(|| {
            HarvestError::Config(format!(
                "GITHUB_TOKEN is not set (environment or {DEFAULT_CONFIG_FILE})"
            ))
        })
    }

    /// `data/checkpoint_{job}_{mode}.json`
    pub fn checkpoint_path(&self, job: &str) -> PathBuf {
        self.data_dir
            .join(format!("checkpoint_{job}_{}.json", self.mode))
    }

    /// CSV sidecar next to [`Self::checkpoint_path`]
    pub fn checkpoint_csv_path(&self, job: &str) -> PathBuf {
        self.checkpoint_path(job).with_extension("csv")
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> HarvestResult<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| HarvestError::Config(format!("{key} must be a number, got '{raw}'"))),
        None => Ok(default),
    }
}
