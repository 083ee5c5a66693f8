//! TOML run manifest: where the staged source files live, where the
//! warehouse goes, and the load options.
//!
//! ```toml
//! db_path = "warehouse.db"
//!
//! [inputs]
//! causes_of_death = "raw/hlth_cd_asdr.tsv"
//! hospital_discharges = "raw/hlth_co_disch.tsv"
//! population = "raw/demo_r_pjangrp3.tsv"
//!
//! [[inputs.emissions]]
//! path = "raw/emissions_fossil_co2.csv"
//! gas = "fossil_co2"
//!
//! [[inputs.emissions]]
//! path = "raw/emissions_ch4.csv"
//! gas = "ch4"
//!
//! [options]
//! tolerance_kt = 1e-6
//! overwrite_last_wins = false
//! level2_only = false
//! timeout_secs = 900
//! vocab_overrides = "vocab.toml"
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RunManifest {
    pub db_path: PathBuf,
    #[serde(default)]
    pub inputs: Inputs,
    #[serde(default)]
    pub options: Options,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Inputs {
    #[serde(default)]
    pub emissions: Vec<EmissionsInput>,
    pub causes_of_death: Option<PathBuf>,
    pub hospital_discharges: Option<PathBuf>,
    pub population: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmissionsInput {
    pub path: PathBuf,
    /// Gas label of the sheet, used when a row's substance cell is blank.
    pub gas: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Tolerance for the sector-aggregate reconciliation check.
    pub tolerance_kt: f64,
    /// Keep the last record per duplicated grain key instead of aborting.
    pub overwrite_last_wins: bool,
    /// Restrict the load to level-2 regions (4-character codes).
    pub level2_only: bool,
    /// Overall run timeout; remaining batches are skipped once exceeded.
    pub timeout_secs: Option<u64>,
    /// Extra vocabulary mappings merged over the built-in tables.
    pub vocab_overrides: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tolerance_kt: 1e-6,
            overwrite_last_wins: false,
            level2_only: false,
            timeout_secs: None,
            vocab_overrides: None,
        }
    }
}

impl RunManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read manifest: {}", path.display()))?;
        let mut manifest: RunManifest = toml::from_str(&text)
            .with_context(|| format!("parse manifest: {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.resolve_paths(base);
        Ok(manifest)
    }

    fn resolve_paths(&mut self, base: &Path) {
        resolve(&mut self.db_path, base);
        for input in &mut self.inputs.emissions {
            resolve(&mut input.path, base);
        }
        if let Some(path) = &mut self.inputs.causes_of_death {
            resolve(path, base);
        }
        if let Some(path) = &mut self.inputs.hospital_discharges {
            resolve(path, base);
        }
        if let Some(path) = &mut self.inputs.population {
            resolve(path, base);
        }
        if let Some(path) = &mut self.options.vocab_overrides {
            resolve(path, base);
        }
    }
}

fn resolve(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        let joined = base.join(path.as_path());
        *path = joined;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_manifest() {
        let manifest: RunManifest = toml::from_str(
            r#"
            db_path = "warehouse.db"

            [inputs]
            causes_of_death = "raw/causes.tsv"
            population = "raw/population.tsv"

            [[inputs.emissions]]
            path = "raw/co2.csv"
            gas = "fossil_co2"

            [options]
            tolerance_kt = 0.5
            overwrite_last_wins = true
            timeout_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(manifest.inputs.emissions.len(), 1);
        assert_eq!(manifest.inputs.emissions[0].gas, "fossil_co2");
        assert!(manifest.inputs.hospital_discharges.is_none());
        assert_eq!(manifest.options.tolerance_kt, 0.5);
        assert!(manifest.options.overwrite_last_wins);
        assert_eq!(manifest.options.timeout_secs, Some(60));
        assert!(!manifest.options.level2_only);
    }

    #[test]
    fn defaults_apply_when_options_absent() {
        let manifest: RunManifest = toml::from_str("db_path = \"w.db\"").unwrap();
        assert_eq!(manifest.options.tolerance_kt, 1e-6);
        assert!(!manifest.options.overwrite_last_wins);
        assert!(manifest.inputs.emissions.is_empty());
    }
}
