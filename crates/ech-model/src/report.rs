//! Run report model: skip accounting, quality issues, per-family summaries.
//!
//! Every run produces a report regardless of success or failure; the CLI
//! renders it and serializes it next to the warehouse.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::record::FactFamily;

/// How many offending values a skip or issue keeps as examples.
pub const SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// A data-quality finding from assembly or post-load verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    /// Stable check identifier (e.g. "foreign_keys", "sector_totals").
    pub check: String,
    pub message: String,
    pub severity: IssueSeverity,
    pub count: Option<u64>,
    /// Sampled offending keys or values, capped at [`SAMPLE_LIMIT`].
    #[serde(default)]
    pub sample: Vec<String>,
}

/// Per-reason counts of rows skipped during ingestion.
///
/// Parse failures are recovered locally: the row is dropped, counted here,
/// and the batch continues.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkipLog {
    counts: BTreeMap<String, u64>,
    samples: BTreeMap<String, Vec<String>>,
}

impl SkipLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one skipped row with the offending value.
    pub fn skip(&mut self, reason: &str, value: &str) {
        *self.counts.entry(reason.to_string()).or_insert(0) += 1;
        let samples = self.samples.entry(reason.to_string()).or_default();
        if samples.len() < SAMPLE_LIMIT {
            samples.push(value.to_string());
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Per-reason (count, samples) pairs in deterministic order.
    pub fn reasons(&self) -> impl Iterator<Item = (&str, u64, &[String])> {
        self.counts.iter().map(|(reason, count)| {
            let samples = self
                .samples
                .get(reason)
                .map(Vec::as_slice)
                .unwrap_or_default();
            (reason.as_str(), *count, samples)
        })
    }

    /// Fold another log into this one (e.g. across multiple input files).
    pub fn merge(&mut self, other: &SkipLog) {
        for (reason, count) in &other.counts {
            *self.counts.entry(reason.clone()).or_insert(0) += count;
        }
        for (reason, samples) in &other.samples {
            let slot = self.samples.entry(reason.clone()).or_default();
            for sample in samples {
                if slot.len() >= SAMPLE_LIMIT {
                    break;
                }
                slot.push(sample.clone());
            }
        }
    }
}

/// Outcome of one fact-family batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Batch committed.
    Loaded,
    /// Batch aborted and rolled back; the warehouse is unchanged for it.
    Aborted,
    /// Batch never ran (no input configured, or the run timed out first).
    Skipped,
}

/// Summary for one fact family within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilySummary {
    pub family: FactFamily,
    pub status: BatchStatus,
    /// Raw rows read from the source files.
    pub rows_read: u64,
    /// Tidy records produced after sentinel handling and filters.
    pub records: u64,
    /// Missing-value sentinels dropped by design (not failures).
    pub missing: u64,
    /// Fact rows written (or that would be written) to the warehouse.
    pub facts: u64,
    pub skipped: SkipLog,
    /// Why the batch aborted, when it did.
    pub error: Option<String>,
}

impl FamilySummary {
    pub fn skipped_total(&self) -> u64 {
        self.skipped.total()
    }
}

/// Full report for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub families: Vec<FamilySummary>,
    /// Post-load integrity findings across the whole warehouse.
    pub issues: Vec<QualityIssue>,
}

impl RunReport {
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Error)
            .count()
            + self
                .families
                .iter()
                .filter(|family| family.status == BatchStatus::Aborted)
                .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}
