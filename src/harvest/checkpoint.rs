//! Resumable progress snapshots
//!
//! A checkpoint holds every record collected so far together with the set of
//! repositories already processed. Jobs save it after each repository and load
//! it on start, skipping the repositories it lists.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::HarvestResult;
use crate::harvest::export::{ensure_parent, write_csv};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "R: Serialize", deserialize = "R: DeserializeOwned"))]
pub struct Checkpoint<R> {
    /// Time of the last save
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_records: usize,
    #[serde(default)]
    pub total_units: usize,
    #[serde(default)]
    pub processed_repos: BTreeSet<String>,
    #[serde(default = "Vec::new")]
    pub records: Vec<R>,
}

impl<R> Checkpoint<R> {
    pub fn new() -> Self {
        Self {
            timestamp: None,
            total_records: 0,
            total_units: 0,
            processed_repos: BTreeSet::new(),
            records: Vec::new(),
        }
    }

    pub fn is_done(&self, unit: &str) -> bool {
        self.processed_repos.contains(unit)
    }

    /// Mark `unit` processed and append the records it produced
    pub fn complete(&mut self, unit: impl Into<String>, records: impl IntoIterator<Item = R>) {
        self.records.extend(records);
        self.processed_repos.insert(unit.into());
        self.total_records = self.records.len();
        self.total_units = self.processed_repos.len();
    }
}

impl<R: DeserializeOwned> Checkpoint<R> {
    /// Read a checkpoint. A missing or unreadable file yields an empty one.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::new(),
            Err(e) => {
                warn!("Could not read checkpoint {}: {e}", path.display());
                return Self::new();
            }
        };

        match serde_json::from_str::<Self>(&text) {
            Ok(checkpoint) => {
                info!(
                    "Checkpoint found: {} records, {} repositories already processed",
                    checkpoint.records.len(),
                    checkpoint.processed_repos.len()
                );
                checkpoint
            }
            Err(e) => {
                warn!(
                    "Ignoring corrupt checkpoint {}: {e}",
                    path.display()
                );
                Self::new()
            }
        }
    }
}

impl<R: Serialize> Checkpoint<R> {
    /// Overwrite `path` with the current state, plus a CSV of the records at
    /// `csv_path` when given.
    ///
    /// The JSON is written to a temporary file in the same directory and
    /// renamed over `path`, so an interrupted save leaves the previous
    /// checkpoint intact.
    pub fn save(&mut self, path: &Path, csv_path: Option<&Path>) -> HarvestResult<()> {
        self.timestamp = Some(Utc::now());
        self.total_records = self.records.len();
        self.total_units = self.processed_repos.len();

        ensure_parent(path)?;
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.persist(path)?;

        if let Some(csv_path) = csv_path {
            write_csv(csv_path, &self.records)?;
        }

        info!(
            "Checkpoint saved: {} records, {} repositories",
            self.total_records, self.total_units
        );
        Ok(())
    }
}

impl<R> Default for Checkpoint<R> {
    fn default() -> Self {
        Self::new()
    }
}
