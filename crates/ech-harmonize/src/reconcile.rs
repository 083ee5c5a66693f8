//! Dimension reconciliation.
//!
//! Collects the canonical dimension rows a batch of tidy records implies:
//! regions keyed by normalized code (first non-null attribute wins, gaps
//! fill later), categories resolved through the closed vocabularies. All
//! unmapped codes in a batch are collected before failing so the caller can
//! fix the vocabulary in one pass.

use std::collections::{BTreeMap, BTreeSet};

use ech_model::{
    CauseOfDeathRecord, DischargeRecord, EmissionRecord, PopulationRecord, Region,
};
use ech_vocab::{GasKind, Icd10Entry, SectorEntry, Vocabulary};

use crate::error::{HarmonizeError, Result};

/// Region rows accumulated across every batch of a run. The region
/// dimension is shared: any source may first sight a code, and richer
/// sources enrich it later without overwriting.
#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    regions: BTreeMap<String, Region>,
}

impl RegionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting of a (already normalized) region code.
    pub fn observe(
        &mut self,
        code: &str,
        label: Option<&str>,
        country_iso: Option<&str>,
        country_name: Option<&str>,
    ) {
        let region = self
            .regions
            .entry(code.to_string())
            .or_insert_with(|| Region::new(code).expect("adapter emits normalized region codes"));
        region.fill_gaps(label, country_iso, country_name);
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&Region> {
        self.regions.get(code)
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    /// Drop every region finer or coarser than the requested level
    /// (the optional level-2-only load mode).
    pub fn retain_level2(&mut self) {
        self.regions
            .retain(|_, region| region.level() == ech_model::RegionLevel::Level2);
    }
}

/// Canonical category rows implied by one emissions batch.
#[derive(Debug, Clone, Default)]
pub struct EmissionsDimensions {
    pub sectors: BTreeMap<String, SectorEntry>,
    pub gases: BTreeSet<GasKind>,
}

/// Canonical ICD-10 rows implied by one health batch.
#[derive(Debug, Clone, Default)]
pub struct Icd10Dimensions {
    pub entries: BTreeMap<String, Icd10Entry>,
}

/// Resolve sector and gas vocabularies for an emissions batch, observing
/// region sightings along the way.
pub fn reconcile_emissions(
    records: &[EmissionRecord],
    vocab: &Vocabulary,
    regions: &mut RegionCatalog,
) -> Result<EmissionsDimensions> {
    let mut dims = EmissionsDimensions::default();
    let mut unmapped_sectors = BTreeSet::new();
    let mut unmapped_gases = BTreeSet::new();
    for record in records {
        regions.observe(
            &record.region_code,
            record.region_label.as_deref(),
            record.country_iso.as_deref(),
            record.country_name.as_deref(),
        );
        match vocab.sectors.get(&record.sector) {
            Some(entry) => {
                dims.sectors
                    .entry(entry.code.clone())
                    .or_insert_with(|| entry.clone());
            }
            None => {
                unmapped_sectors.insert(record.sector.trim().to_string());
            }
        }
        match vocab.gases.get(&record.gas) {
            Some(kind) => {
                dims.gases.insert(kind);
            }
            None => {
                unmapped_gases.insert(record.gas.trim().to_string());
            }
        }
    }
    if !unmapped_sectors.is_empty() {
        return Err(HarmonizeError::UnmappedVocabulary {
            dimension: "sector",
            codes: unmapped_sectors.into_iter().collect(),
        });
    }
    if !unmapped_gases.is_empty() {
        return Err(HarmonizeError::UnmappedVocabulary {
            dimension: "gas",
            codes: unmapped_gases.into_iter().collect(),
        });
    }
    Ok(dims)
}

/// Resolve the ICD-10 vocabulary for a cause-of-death batch.
pub fn reconcile_causes(
    records: &[CauseOfDeathRecord],
    vocab: &Vocabulary,
    regions: &mut RegionCatalog,
) -> Result<Icd10Dimensions> {
    reconcile_icd10(
        records.iter().map(|r| (r.region_code.as_str(), r.cause.as_str())),
        vocab,
        regions,
    )
}

/// Resolve the ICD-10 vocabulary for a hospital-discharge batch.
pub fn reconcile_discharges(
    records: &[DischargeRecord],
    vocab: &Vocabulary,
    regions: &mut RegionCatalog,
) -> Result<Icd10Dimensions> {
    reconcile_icd10(
        records
            .iter()
            .map(|r| (r.region_code.as_str(), r.discharge_group.as_str())),
        vocab,
        regions,
    )
}

fn reconcile_icd10<'a>(
    records: impl Iterator<Item = (&'a str, &'a str)>,
    vocab: &Vocabulary,
    regions: &mut RegionCatalog,
) -> Result<Icd10Dimensions> {
    let mut dims = Icd10Dimensions::default();
    let mut unmapped = BTreeSet::new();
    for (region_code, raw_code) in records {
        regions.observe(region_code, None, None, None);
        match vocab.icd10.get(raw_code) {
            Some(entry) => {
                dims.entries.entry(entry.code.clone()).or_insert(entry);
            }
            None => {
                unmapped.insert(raw_code.trim().to_string());
            }
        }
    }
    if !unmapped.is_empty() {
        return Err(HarmonizeError::UnmappedVocabulary {
            dimension: "icd10",
            codes: unmapped.into_iter().collect(),
        });
    }
    Ok(dims)
}

/// Observe region sightings from a population batch (no category vocabulary
/// to resolve).
pub fn reconcile_population(records: &[PopulationRecord], regions: &mut RegionCatalog) {
    for record in records {
        regions.observe(&record.region_code, None, None, None);
    }
}
