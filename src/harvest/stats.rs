//! Summary statistics over collected records

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::harvest::model::{PrStatus, PullRequestRecord, RepositoryRecord};

/// Arithmetic mean, `None` for no values
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator), `None` below two values
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((squares / (values.len() - 1) as f64).sqrt())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spread {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Spread {
    pub fn of(values: &[f64]) -> Option<Self> {
        let mean = mean(values)?;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self { mean, min, max })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRequestMetrics {
    pub files_changed: Spread,
    pub total_changes: Spread,
    pub analysis_time_hours: Spread,
    pub num_reviews: Spread,
    pub num_comments: Spread,
}

/// Written next to the final pull request dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRequestStats {
    pub total_prs: usize,
    pub merged_prs: usize,
    pub closed_prs: usize,
    pub repositories_count: usize,
    pub metrics: PullRequestMetrics,
}

impl PullRequestStats {
    pub fn from_records(records: &[PullRequestRecord]) -> Option<Self> {
        let merged_prs = records
            .iter()
            .filter(|r| r.status == PrStatus::Merged)
            .count();
        let repositories: BTreeSet<&str> = records.iter().map(|r| r.repository.as_str()).collect();

        Some(Self {
            total_prs: records.len(),
            merged_prs,
            closed_prs: records.len() - merged_prs,
            repositories_count: repositories.len(),
            metrics: PullRequestMetrics {
                files_changed: Spread::of(&column(records, |r| r.files_changed as f64))?,
                total_changes: Spread::of(&column(records, |r| r.total_changes as f64))?,
                analysis_time_hours: Spread::of(&column(records, |r| r.analysis_time_hours))?,
                num_reviews: Spread::of(&column(records, |r| r.num_reviews as f64))?,
                num_comments: Spread::of(&column(records, |r| r.num_comments as f64))?,
            },
        })
    }
}

fn column(records: &[PullRequestRecord], f: impl Fn(&PullRequestRecord) -> f64) -> Vec<f64> {
    records.iter().map(f).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageShare {
    pub language: String,
    pub count: usize,
    pub percentage: f64,
}

/// Totals logged at the end of the `repos` job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositorySummary {
    pub count: usize,
    pub total_stars: u64,
    pub mean_age_days: f64,
    /// Most common primary languages, at most five
    pub top_languages: Vec<LanguageShare>,
}

impl RepositorySummary {
    pub const TOP_LANGUAGES: usize = 5;

    pub fn from_records(records: &[RepositoryRecord]) -> Option<Self> {
        let ages: Vec<f64> = records.iter().map(|r| r.age_days as f64).collect();
        let mean_age_days = mean(&ages)?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in records {
            *counts.entry(record.primary_language.as_str()).or_default() += 1;
        }
        let mut languages: Vec<(&str, usize)> = counts.into_iter().collect();
        languages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        Some(Self {
            count: records.len(),
            total_stars: records.iter().map(|r| r.stars).sum(),
            mean_age_days,
            top_languages: languages
                .into_iter()
                .take(Self::TOP_LANGUAGES)
                .map(|(language, count)| LanguageShare {
                    language: language.to_string(),
                    count,
                    percentage: count as f64 * 100.0 / records.len() as f64,
                })
                .collect(),
        })
    }
}
