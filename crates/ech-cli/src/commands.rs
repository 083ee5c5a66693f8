//! Subcommand implementations: thin wrappers over the pipeline.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use ech_harmonize::OverwritePolicy;
use ech_model::{FactFamily, RunReport};
use ech_warehouse::{IntegrityOptions, Warehouse};

use crate::cli::{FamilyArgs, LoadArgs, VerifyArgs};
use crate::manifest::RunManifest;
use crate::pipeline::{PipelineOptions, run_pipeline};

pub fn run_load(args: &LoadArgs) -> Result<RunReport> {
    let manifest = RunManifest::load(&args.manifest)?;
    let mut options = PipelineOptions::from_manifest(&manifest);
    apply_flag_overrides(
        &mut options,
        args.overwrite_last_wins,
        args.level2_only,
    );
    let mut warehouse = open_warehouse(&manifest, args.db.as_deref())?;
    let report = run_pipeline(&manifest, &mut warehouse, &options)?;
    write_report_json(args.report.as_deref(), &report)?;
    Ok(report)
}

pub fn run_family(args: &FamilyArgs) -> Result<RunReport> {
    let manifest = RunManifest::load(&args.manifest)?;
    let mut options = PipelineOptions::from_manifest(&manifest);
    apply_flag_overrides(
        &mut options,
        args.overwrite_last_wins,
        args.level2_only,
    );
    let family: FactFamily = args.family.into();
    options.families = Some(BTreeSet::from([family]));
    let mut warehouse = open_warehouse(&manifest, args.db.as_deref())?;
    let report = run_pipeline(&manifest, &mut warehouse, &options)?;
    write_report_json(args.report.as_deref(), &report)?;
    Ok(report)
}

pub fn run_verify(args: &VerifyArgs) -> Result<RunReport> {
    let manifest = RunManifest::load(&args.manifest)?;
    let warehouse = open_warehouse(&manifest, args.db.as_deref())?;
    let integrity = IntegrityOptions {
        tolerance_kt: manifest.options.tolerance_kt,
    };
    let mut report = RunReport::default();
    match warehouse.verify(None, &integrity) {
        Ok(issues) => report.issues = issues,
        Err(ech_warehouse::WarehouseError::ForeignKey {
            fact_table,
            dimension,
            count,
        }) => report.issues.push(ech_model::QualityIssue {
            check: "foreign_keys".to_string(),
            message: format!("{fact_table}: {count} rows reference missing {dimension} keys"),
            severity: ech_model::IssueSeverity::Error,
            count: Some(count),
            sample: Vec::new(),
        }),
        Err(other) => return Err(other.into()),
    }
    Ok(report)
}

fn apply_flag_overrides(options: &mut PipelineOptions, overwrite_last_wins: bool, level2_only: bool) {
    if overwrite_last_wins {
        options.policy = OverwritePolicy::LastWins;
    }
    if level2_only {
        options.level2_only = true;
    }
}

fn open_warehouse(manifest: &RunManifest, db_override: Option<&Path>) -> Result<Warehouse> {
    let path: PathBuf = db_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest.db_path.clone());
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create warehouse directory: {}", parent.display()))?;
    }
    info!(db = %path.display(), "opening warehouse");
    Warehouse::open(&path).with_context(|| format!("open warehouse: {}", path.display()))
}

fn write_report_json(path: Option<&Path>, report: &RunReport) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(report).context("serialize run report")?;
    std::fs::write(path, json).with_context(|| format!("write report: {}", path.display()))?;
    Ok(())
}
