//! Staged load pipeline.
//!
//! Stages run strictly forward per fact family: adapters, reconciliation,
//! assembly, load. Families are independent batches except that the
//! discharge-rate derivation and the coverage refresh run only after the
//! population batch has committed. Every run, successful or not, yields a
//! `RunReport`.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{info, warn};

use ech_harmonize::{
    Assembled, OverwritePolicy, RegionCatalog, apply_discharge_rates, assemble_causes,
    assemble_discharges, assemble_emissions, assemble_population, compute_coverage,
    reconcile_causes, reconcile_discharges, reconcile_emissions, reconcile_population,
};
use ech_ingest::{
    AdapterOutput, EmissionsSource, read_causes_of_death, read_emissions,
    read_hospital_discharges, read_population,
};
use ech_model::{
    BatchStatus, FactFamily, FamilySummary, IssueSeverity, QualityIssue, RunReport, SkipLog,
};
use ech_vocab::Vocabulary;
use ech_warehouse::{IntegrityOptions, SectorTotals, Warehouse, WarehouseError};

use crate::manifest::RunManifest;

/// Options resolved from the manifest and CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub policy: OverwritePolicy,
    pub level2_only: bool,
    pub tolerance_kt: f64,
    pub timeout: Option<Duration>,
    /// When set, only these families are processed.
    pub families: Option<BTreeSet<FactFamily>>,
}

impl PipelineOptions {
    pub fn from_manifest(manifest: &RunManifest) -> Self {
        Self {
            policy: if manifest.options.overwrite_last_wins {
                OverwritePolicy::LastWins
            } else {
                OverwritePolicy::Abort
            },
            level2_only: manifest.options.level2_only,
            tolerance_kt: manifest.options.tolerance_kt,
            timeout: manifest.options.timeout_secs.map(Duration::from_secs),
            families: None,
        }
    }

    fn wants(&self, family: FactFamily) -> bool {
        self.families
            .as_ref()
            .is_none_or(|set| set.contains(&family))
    }
}

/// Overall run deadline, checked between batches. Committed batches stay
/// visible; remaining ones are skipped and reported.
struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    fn new(limit: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    fn expired(&self) -> bool {
        self.limit
            .is_some_and(|limit| self.start.elapsed() >= limit)
    }
}

/// Run the configured families against the warehouse.
pub fn run_pipeline(
    manifest: &RunManifest,
    warehouse: &mut Warehouse,
    options: &PipelineOptions,
) -> Result<RunReport> {
    let vocab = match &manifest.options.vocab_overrides {
        Some(path) => Vocabulary::with_overrides(path)?,
        None => Vocabulary::builtin(),
    };
    let deadline = Deadline::new(options.timeout);
    let mut report = RunReport::default();
    let mut sector_totals = None;

    if options.wants(FactFamily::Emissions) {
        let summary = run_emissions(
            manifest,
            &vocab,
            warehouse,
            options,
            &deadline,
            &mut report.issues,
            &mut sector_totals,
        );
        report.families.push(summary);
    }
    if options.wants(FactFamily::CausesOfDeath) {
        let summary = run_causes(manifest, &vocab, warehouse, options, &deadline, &mut report.issues);
        report.families.push(summary);
    }
    // Population commits before discharges so the rate join can resolve.
    if options.wants(FactFamily::Population) {
        let summary = run_population(manifest, warehouse, options, &deadline, &mut report.issues);
        report.families.push(summary);
    }
    if options.wants(FactFamily::HospitalDischarges) {
        let summary =
            run_discharges(manifest, &vocab, warehouse, options, &deadline, &mut report.issues);
        report.families.push(summary);
    }

    finalize(warehouse, options, sector_totals.as_ref(), &mut report)?;
    Ok(report)
}

/// Post-batch recomputations and verification. Runs even when every family
/// aborted: the report must still describe the store.
fn finalize(
    warehouse: &mut Warehouse,
    options: &PipelineOptions,
    sector_totals: Option<&SectorTotals>,
    report: &mut RunReport,
) -> Result<()> {
    warehouse.refresh_discharge_rates()?;
    let family_years = warehouse.family_years()?;
    let span = compute_coverage(&family_years);
    warehouse.ensure_time_span(&span)?;
    warehouse.refresh_coverage()?;

    let integrity = IntegrityOptions {
        tolerance_kt: options.tolerance_kt,
    };
    match warehouse.verify(sector_totals, &integrity) {
        Ok(issues) => report.issues.extend(issues),
        Err(WarehouseError::ForeignKey {
            fact_table,
            dimension,
            count,
        }) => report.issues.push(QualityIssue {
            check: "foreign_keys".to_string(),
            message: format!(
                "{fact_table}: {count} rows reference missing {dimension} keys"
            ),
            severity: IssueSeverity::Error,
            count: Some(count),
            sample: Vec::new(),
        }),
        Err(other) => return Err(other.into()),
    }
    Ok(())
}

fn skipped_summary(family: FactFamily, error: Option<String>) -> FamilySummary {
    FamilySummary {
        family,
        status: BatchStatus::Skipped,
        rows_read: 0,
        records: 0,
        missing: 0,
        facts: 0,
        skipped: SkipLog::new(),
        error,
    }
}

/// The source file itself could not be read or parsed.
fn ingest_failed(family: FactFamily, error: String) -> FamilySummary {
    warn!(%family, %error, "batch aborted");
    FamilySummary {
        family,
        status: BatchStatus::Aborted,
        rows_read: 0,
        records: 0,
        missing: 0,
        facts: 0,
        skipped: SkipLog::new(),
        error: Some(error),
    }
}

fn aborted_summary<T>(
    family: FactFamily,
    adapter: &AdapterOutput<T>,
    error: String,
) -> FamilySummary {
    warn!(%family, %error, "batch aborted");
    FamilySummary {
        family,
        status: BatchStatus::Aborted,
        rows_read: adapter.rows_read,
        records: adapter.records.len() as u64,
        missing: adapter.missing,
        facts: 0,
        skipped: adapter.skipped.clone(),
        error: Some(error),
    }
}

fn loaded_summary<T>(
    family: FactFamily,
    adapter: &AdapterOutput<T>,
    facts: u64,
) -> FamilySummary {
    info!(%family, facts, "batch loaded");
    FamilySummary {
        family,
        status: BatchStatus::Loaded,
        rows_read: adapter.rows_read,
        records: adapter.records.len() as u64,
        missing: adapter.missing,
        facts,
        skipped: adapter.skipped.clone(),
        error: None,
    }
}

fn retain_level2<T>(records: &mut Vec<T>, code: impl Fn(&T) -> &str) {
    records.retain(|record| code(record).len() == 4);
}

fn note_duplicates<T>(issues: &mut Vec<QualityIssue>, assembled: &Assembled<T>) {
    if let Some(issue) = &assembled.duplicates {
        issues.push(issue.clone());
    }
}

/// Years touched by a batch, for the per-batch time upsert.
fn batch_years(years: impl Iterator<Item = i32>) -> Vec<ech_model::TimePeriod> {
    let distinct: BTreeSet<i32> = years.collect();
    distinct.into_iter().map(ech_model::TimePeriod::new).collect()
}

#[allow(clippy::too_many_arguments)]
fn run_emissions(
    manifest: &RunManifest,
    vocab: &Vocabulary,
    warehouse: &mut Warehouse,
    options: &PipelineOptions,
    deadline: &Deadline,
    issues: &mut Vec<QualityIssue>,
    sector_totals: &mut Option<SectorTotals>,
) -> FamilySummary {
    let family = FactFamily::Emissions;
    if manifest.inputs.emissions.is_empty() {
        return skipped_summary(family, Some("no input configured".to_string()));
    }
    if deadline.expired() {
        return skipped_summary(family, Some("run timeout exceeded".to_string()));
    }
    let sources: Vec<EmissionsSource> = manifest
        .inputs
        .emissions
        .iter()
        .map(|input| EmissionsSource {
            path: input.path.clone(),
            gas_label: input.gas.clone(),
        })
        .collect();
    let mut adapter = match read_emissions(&sources) {
        Ok(adapter) => adapter,
        Err(error) => return ingest_failed(family, error.to_string()),
    };
    if options.level2_only {
        retain_level2(&mut adapter.records, |record| &record.region_code);
    }
    let mut regions = RegionCatalog::new();
    let dims = match reconcile_emissions(&adapter.records, vocab, &mut regions) {
        Ok(dims) => dims,
        Err(error) => return aborted_summary(family, &adapter, error.to_string()),
    };
    let assembled = match assemble_emissions(&adapter.records, vocab, options.policy) {
        Ok(assembled) => assembled,
        Err(error) => return aborted_summary(family, &adapter, error.to_string()),
    };
    note_duplicates(issues, &assembled);
    let time = batch_years(assembled.facts.iter().map(|fact| fact.year));
    match warehouse.load_emissions_batch(&regions, &time, &dims, &assembled.facts) {
        Ok(stats) => {
            *sector_totals = Some(SectorTotals::from_facts(&assembled.facts));
            loaded_summary(family, &adapter, stats.facts)
        }
        Err(error) => aborted_summary(family, &adapter, error.to_string()),
    }
}

fn run_causes(
    manifest: &RunManifest,
    vocab: &Vocabulary,
    warehouse: &mut Warehouse,
    options: &PipelineOptions,
    deadline: &Deadline,
    issues: &mut Vec<QualityIssue>,
) -> FamilySummary {
    let family = FactFamily::CausesOfDeath;
    let Some(path) = &manifest.inputs.causes_of_death else {
        return skipped_summary(family, Some("no input configured".to_string()));
    };
    if deadline.expired() {
        return skipped_summary(family, Some("run timeout exceeded".to_string()));
    }
    let mut adapter = match read_causes_of_death(path) {
        Ok(adapter) => adapter,
        Err(error) => return ingest_failed(family, error.to_string()),
    };
    if options.level2_only {
        retain_level2(&mut adapter.records, |record| &record.region_code);
    }
    let mut regions = RegionCatalog::new();
    let dims = match reconcile_causes(&adapter.records, vocab, &mut regions) {
        Ok(dims) => dims,
        Err(error) => return aborted_summary(family, &adapter, error.to_string()),
    };
    let assembled = match assemble_causes(&adapter.records, vocab, options.policy) {
        Ok(assembled) => assembled,
        Err(error) => return aborted_summary(family, &adapter, error.to_string()),
    };
    note_duplicates(issues, &assembled);
    let time = batch_years(assembled.facts.iter().map(|fact| fact.year));
    match warehouse.load_causes_batch(&regions, &time, &dims, &assembled.facts) {
        Ok(stats) => loaded_summary(family, &adapter, stats.facts),
        Err(error) => aborted_summary(family, &adapter, error.to_string()),
    }
}

fn run_population(
    manifest: &RunManifest,
    warehouse: &mut Warehouse,
    options: &PipelineOptions,
    deadline: &Deadline,
    issues: &mut Vec<QualityIssue>,
) -> FamilySummary {
    let family = FactFamily::Population;
    let Some(path) = &manifest.inputs.population else {
        return skipped_summary(family, Some("no input configured".to_string()));
    };
    if deadline.expired() {
        return skipped_summary(family, Some("run timeout exceeded".to_string()));
    }
    let mut adapter = match read_population(path) {
        Ok(adapter) => adapter,
        Err(error) => return ingest_failed(family, error.to_string()),
    };
    if options.level2_only {
        retain_level2(&mut adapter.records, |record| &record.region_code);
    }
    let mut regions = RegionCatalog::new();
    reconcile_population(&adapter.records, &mut regions);
    let assembled = match assemble_population(&adapter.records, options.policy) {
        Ok(assembled) => assembled,
        Err(error) => return aborted_summary(family, &adapter, error.to_string()),
    };
    note_duplicates(issues, &assembled);
    let time = batch_years(assembled.facts.iter().map(|fact| fact.year));
    match warehouse.load_population_batch(&regions, &time, &assembled.facts) {
        Ok(stats) => loaded_summary(family, &adapter, stats.facts),
        Err(error) => aborted_summary(family, &adapter, error.to_string()),
    }
}

fn run_discharges(
    manifest: &RunManifest,
    vocab: &Vocabulary,
    warehouse: &mut Warehouse,
    options: &PipelineOptions,
    deadline: &Deadline,
    issues: &mut Vec<QualityIssue>,
) -> FamilySummary {
    let family = FactFamily::HospitalDischarges;
    let Some(path) = &manifest.inputs.hospital_discharges else {
        return skipped_summary(family, Some("no input configured".to_string()));
    };
    if deadline.expired() {
        return skipped_summary(family, Some("run timeout exceeded".to_string()));
    }
    let mut adapter = match read_hospital_discharges(path) {
        Ok(adapter) => adapter,
        Err(error) => return ingest_failed(family, error.to_string()),
    };
    if options.level2_only {
        retain_level2(&mut adapter.records, |record| &record.region_code);
    }
    let mut regions = RegionCatalog::new();
    let dims = match reconcile_discharges(&adapter.records, vocab, &mut regions) {
        Ok(dims) => dims,
        Err(error) => return aborted_summary(family, &adapter, error.to_string()),
    };
    let mut assembled = match assemble_discharges(&adapter.records, vocab, options.policy) {
        Ok(assembled) => assembled,
        Err(error) => return aborted_summary(family, &adapter, error.to_string()),
    };
    note_duplicates(issues, &assembled);
    // Population committed earlier in the run (or in a previous run); the
    // left join resolves against the store.
    let population = match warehouse.population_facts() {
        Ok(population) => population,
        Err(error) => return aborted_summary(family, &adapter, error.to_string()),
    };
    apply_discharge_rates(&mut assembled.facts, &population);
    let time = batch_years(assembled.facts.iter().map(|fact| fact.year));
    match warehouse.load_discharges_batch(&regions, &time, &dims, &assembled.facts) {
        Ok(stats) => loaded_summary(family, &adapter, stats.facts),
        Err(error) => aborted_summary(family, &adapter, error.to_string()),
    }
}
