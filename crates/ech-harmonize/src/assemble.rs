//! Fact assembly.
//!
//! Maps reconciled tidy records onto fact rows referencing dimension keys,
//! enforcing the per-stream grain at assembly time. A duplicate grain key
//! within one batch signals an upstream taxonomy change and aborts the
//! batch, unless the caller explicitly requests last-wins overwriting, in
//! which case the duplicates are still reported.

use std::collections::BTreeMap;

use ech_model::{
    CauseOfDeathFact, CauseOfDeathRecord, DischargeFact, DischargeRecord, EmissionRecord,
    EmissionsFact, FactFamily, IssueSeverity, PopulationFact, PopulationRecord, QualityIssue,
    SAMPLE_LIMIT, surrogate_key,
};
use ech_vocab::Vocabulary;

use crate::error::{HarmonizeError, Result};

/// What to do when one batch repeats a grain key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Abort the batch (default): duplicate grains mean the source changed
    /// its taxonomy and any overwrite order would be ambiguous.
    #[default]
    Abort,
    /// Keep the last record per grain and report the duplicates.
    LastWins,
}

/// Assembled fact rows plus the duplicate report, when any were found under
/// last-wins.
#[derive(Debug, Clone)]
pub struct Assembled<T> {
    pub facts: Vec<T>,
    pub duplicates: Option<QualityIssue>,
}

/// Deduplicate by natural grain key. Keys double as the human-readable
/// samples in reports.
fn dedupe<T>(
    items: Vec<(String, T)>,
    family: FactFamily,
    policy: OverwritePolicy,
) -> Result<Assembled<T>> {
    let mut index: BTreeMap<String, usize> = BTreeMap::new();
    let mut facts: Vec<T> = Vec::with_capacity(items.len());
    let mut duplicate_count = 0u64;
    let mut sample: Vec<String> = Vec::new();
    for (key, fact) in items {
        match index.get(&key) {
            Some(&slot) => {
                duplicate_count += 1;
                if sample.len() < SAMPLE_LIMIT {
                    sample.push(key.clone());
                }
                // Last record wins; earlier value is replaced in place.
                facts[slot] = fact;
            }
            None => {
                index.insert(key, facts.len());
                facts.push(fact);
            }
        }
    }
    if duplicate_count > 0 {
        match policy {
            OverwritePolicy::Abort => {
                return Err(HarmonizeError::DuplicateGrain {
                    family,
                    count: duplicate_count,
                    sample,
                });
            }
            OverwritePolicy::LastWins => {
                return Ok(Assembled {
                    facts,
                    duplicates: Some(QualityIssue {
                        check: "grain_uniqueness".to_string(),
                        message: format!(
                            "{family}: {duplicate_count} duplicate grain keys overwritten (last wins)"
                        ),
                        severity: IssueSeverity::Warning,
                        count: Some(duplicate_count),
                        sample,
                    }),
                });
            }
        }
    }
    Ok(Assembled {
        facts,
        duplicates: None,
    })
}

/// Assemble emissions facts at grain (region, year, sector, gas).
///
/// Values from different adapters are never summed: one adapter is
/// authoritative for the stream, and duplicates fall under the grain policy.
pub fn assemble_emissions(
    records: &[EmissionRecord],
    vocab: &Vocabulary,
    policy: OverwritePolicy,
) -> Result<Assembled<EmissionsFact>> {
    let mut keyed = Vec::with_capacity(records.len());
    for record in records {
        let sector = vocab.sectors.resolve(&record.sector).map_err(unmapped)?;
        let gas = vocab.gases.resolve(&record.gas).map_err(unmapped)?;
        let key = format!(
            "{}/{}/{}/{}",
            record.region_code,
            record.year,
            sector.code,
            gas.code()
        );
        keyed.push((
            key,
            EmissionsFact {
                region_id: surrogate_key("region", &record.region_code),
                year: record.year,
                sector_id: surrogate_key("sector", &sector.code),
                gas_id: surrogate_key("gas", gas.code()),
                value_kt: record.value_kt,
            },
        ));
    }
    dedupe(keyed, FactFamily::Emissions, policy)
}

/// Assemble cause-of-death facts at grain (region, year, cause).
pub fn assemble_causes(
    records: &[CauseOfDeathRecord],
    vocab: &Vocabulary,
    policy: OverwritePolicy,
) -> Result<Assembled<CauseOfDeathFact>> {
    let mut keyed = Vec::with_capacity(records.len());
    for record in records {
        let entry = vocab.icd10.resolve(&record.cause).map_err(unmapped)?;
        let key = format!("{}/{}/{}", record.region_code, record.year, entry.code);
        keyed.push((
            key,
            CauseOfDeathFact {
                region_id: surrogate_key("region", &record.region_code),
                year: record.year,
                cause_id: surrogate_key("cause", &entry.code),
                rate_per_100k: record.rate_per_100k,
            },
        ));
    }
    dedupe(keyed, FactFamily::CausesOfDeath, policy)
}

/// Assemble hospital-discharge facts at grain (region, year, group).
///
/// The derived rate starts null; the derived-metric pass fills it in after
/// the population stream commits.
pub fn assemble_discharges(
    records: &[DischargeRecord],
    vocab: &Vocabulary,
    policy: OverwritePolicy,
) -> Result<Assembled<DischargeFact>> {
    let mut keyed = Vec::with_capacity(records.len());
    for record in records {
        let entry = vocab.icd10.resolve(&record.discharge_group).map_err(unmapped)?;
        let key = format!("{}/{}/{}", record.region_code, record.year, entry.code);
        keyed.push((
            key,
            DischargeFact {
                region_id: surrogate_key("region", &record.region_code),
                year: record.year,
                discharge_id: surrogate_key("discharge", &entry.code),
                count: record.count,
                rate_per_100k: None,
            },
        ));
    }
    dedupe(keyed, FactFamily::HospitalDischarges, policy)
}

/// Assemble population facts at grain (region, year).
pub fn assemble_population(
    records: &[PopulationRecord],
    policy: OverwritePolicy,
) -> Result<Assembled<PopulationFact>> {
    let keyed = records
        .iter()
        .map(|record| {
            (
                format!("{}/{}", record.region_code, record.year),
                PopulationFact {
                    region_id: surrogate_key("region", &record.region_code),
                    year: record.year,
                    population: record.population,
                },
            )
        })
        .collect();
    dedupe(keyed, FactFamily::Population, policy)
}

fn unmapped(err: ech_vocab::VocabError) -> HarmonizeError {
    match err {
        ech_vocab::VocabError::Unmapped { dimension, code } => HarmonizeError::UnmappedVocabulary {
            dimension,
            codes: vec![code],
        },
        other => HarmonizeError::UnmappedVocabulary {
            dimension: "vocabulary",
            codes: vec![other.to_string()],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emission(region: &str, year: i32, sector: &str, gas: &str, value: f64) -> EmissionRecord {
        EmissionRecord {
            region_code: region.to_string(),
            region_label: None,
            country_iso: None,
            country_name: None,
            year,
            sector: sector.to_string(),
            gas: gas.to_string(),
            value_kt: value,
        }
    }

    #[test]
    fn duplicate_grain_aborts_by_default() {
        let vocab = Vocabulary::builtin();
        let records = vec![
            emission("AT11", 2020, "Energy", "CO2", 120.5),
            emission("AT11", 2020, "Energy", "CO2", 130.0),
        ];
        let err = assemble_emissions(&records, &vocab, OverwritePolicy::Abort).unwrap_err();
        match err {
            HarmonizeError::DuplicateGrain { family, count, sample } => {
                assert_eq!(family, FactFamily::Emissions);
                assert_eq!(count, 1);
                assert_eq!(sample, vec!["AT11/2020/Energy/CO2".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn last_wins_keeps_final_value_and_reports() {
        let vocab = Vocabulary::builtin();
        let records = vec![
            emission("AT11", 2020, "Energy", "CO2", 120.5),
            emission("AT11", 2020, "Energy", "CO2", 130.0),
        ];
        let assembled =
            assemble_emissions(&records, &vocab, OverwritePolicy::LastWins).unwrap();
        assert_eq!(assembled.facts.len(), 1);
        assert_eq!(assembled.facts[0].value_kt, 130.0);
        let issue = assembled.duplicates.unwrap();
        assert_eq!(issue.count, Some(1));
        assert_eq!(issue.severity, IssueSeverity::Warning);
    }

    #[test]
    fn gas_label_variants_converge_on_one_grain() {
        let vocab = Vocabulary::builtin();
        // Two raw labels for the same canonical gas: that IS a duplicate.
        let records = vec![
            emission("AT11", 2020, "Energy", "CO2", 1.0),
            emission("AT11", 2020, "Energy", "fossil_co2", 2.0),
        ];
        let err = assemble_emissions(&records, &vocab, OverwritePolicy::Abort).unwrap_err();
        assert!(matches!(err, HarmonizeError::DuplicateGrain { .. }));
    }

    #[test]
    fn population_grain_is_region_year() {
        let records = vec![
            PopulationRecord {
                region_code: "AT11".to_string(),
                year: 2019,
                population: 100000.0,
            },
            PopulationRecord {
                region_code: "AT12".to_string(),
                year: 2019,
                population: 250000.0,
            },
        ];
        let assembled = assemble_population(&records, OverwritePolicy::Abort).unwrap();
        assert_eq!(assembled.facts.len(), 2);
        assert!(assembled.duplicates.is_none());
        assert_ne!(assembled.facts[0].region_id, assembled.facts[1].region_id);
    }

    #[test]
    fn discharge_rate_starts_null() {
        let vocab = Vocabulary::builtin();
        let records = vec![DischargeRecord {
            region_code: "AT11".to_string(),
            year: 2019,
            discharge_group: "J45_J46".to_string(),
            count: 500.0,
        }];
        let assembled = assemble_discharges(&records, &vocab, OverwritePolicy::Abort).unwrap();
        assert_eq!(assembled.facts[0].rate_per_100k, None);
        assert_eq!(assembled.facts[0].count, 500.0);
    }
}
