//! Collection jobs and the records they produce

pub mod checkpoint;
pub mod export;
pub mod metrics;
pub mod model;
pub mod pull_requests;
pub mod repositories;
pub mod stats;

use std::path::PathBuf;

pub use checkpoint::Checkpoint;
pub use model::{PrStatus, PullRequestRecord, RepositoryCandidate, RepositoryRecord};

/// What a finished job left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    /// Records in the final dataset, resumed ones included
    pub records: usize,
    /// Repositories completed during this run
    pub completed: usize,
    /// Repositories skipped because the checkpoint already had them
    pub resumed: usize,
    /// Repositories given up on
    pub failed: usize,
    pub outputs: Vec<PathBuf>,
}
