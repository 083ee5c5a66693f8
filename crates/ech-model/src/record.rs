//! Tidy per-fact records as emitted by the source adapters.
//!
//! Each record carries raw (source-vocabulary) codes; the reconciler maps
//! them onto canonical dimension keys before assembly. Null measurements are
//! dropped inside the adapters and never reach these types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four independent fact streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactFamily {
    Emissions,
    CausesOfDeath,
    HospitalDischarges,
    Population,
}

impl FactFamily {
    pub const ALL: [FactFamily; 4] = [
        FactFamily::Emissions,
        FactFamily::CausesOfDeath,
        FactFamily::HospitalDischarges,
        FactFamily::Population,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FactFamily::Emissions => "emissions",
            FactFamily::CausesOfDeath => "causes-of-death",
            FactFamily::HospitalDischarges => "hospital-discharges",
            FactFamily::Population => "population",
        }
    }
}

impl fmt::Display for FactFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FactFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "emissions" => Ok(FactFamily::Emissions),
            "causes-of-death" | "causes" => Ok(FactFamily::CausesOfDeath),
            "hospital-discharges" | "discharges" => Ok(FactFamily::HospitalDischarges),
            "population" => Ok(FactFamily::Population),
            other => Err(format!("unknown fact family: {other}")),
        }
    }
}

/// One emissions measurement in kilotonnes CO2-equivalent.
///
/// Emissions sources are the richest: they also carry region labels and
/// country attributes used to enrich the region dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub region_code: String,
    pub region_label: Option<String>,
    pub country_iso: Option<String>,
    pub country_name: Option<String>,
    pub year: i32,
    pub sector: String,
    pub gas: String,
    pub value_kt: f64,
}

/// One age-standardized cause-of-death rate per 100 000 inhabitants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CauseOfDeathRecord {
    pub region_code: String,
    pub year: i32,
    pub cause: String,
    pub rate_per_100k: f64,
}

/// One raw hospital-discharge count for an ICD-10 discharge group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DischargeRecord {
    pub region_code: String,
    pub year: i32,
    pub discharge_group: String,
    pub count: f64,
}

/// One population count for a region-year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecord {
    pub region_code: String,
    pub year: i32,
    pub population: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_round_trips_through_str() {
        for family in FactFamily::ALL {
            assert_eq!(family.as_str().parse::<FactFamily>().unwrap(), family);
        }
    }

    #[test]
    fn family_accepts_short_aliases() {
        assert_eq!(
            "discharges".parse::<FactFamily>().unwrap(),
            FactFamily::HospitalDischarges
        );
        assert_eq!(
            "causes".parse::<FactFamily>().unwrap(),
            FactFamily::CausesOfDeath
        );
    }
}
