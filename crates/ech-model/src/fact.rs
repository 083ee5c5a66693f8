//! Fact rows referencing resolved dimension keys.
//!
//! Facts carry keys and measurements only; descriptive text lives in the
//! dimension tables. Each fact stream has a fixed grain, and the grain key
//! never repeats within a loaded batch.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionsFact {
    pub region_id: i64,
    pub year: i32,
    pub sector_id: i64,
    pub gas_id: i64,
    pub value_kt: f64,
}

impl EmissionsFact {
    /// Grain: (region, year, sector, gas).
    pub fn grain(&self) -> (i64, i32, i64, i64) {
        (self.region_id, self.year, self.sector_id, self.gas_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CauseOfDeathFact {
    pub region_id: i64,
    pub year: i32,
    pub cause_id: i64,
    pub rate_per_100k: f64,
}

impl CauseOfDeathFact {
    /// Grain: (region, year, cause).
    pub fn grain(&self) -> (i64, i32, i64) {
        (self.region_id, self.year, self.cause_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DischargeFact {
    pub region_id: i64,
    pub year: i32,
    pub discharge_id: i64,
    pub count: f64,
    /// Derived rate per 100 000 population; null when no population fact
    /// exists for the same (region, year).
    pub rate_per_100k: Option<f64>,
}

impl DischargeFact {
    /// Grain: (region, year, discharge group).
    pub fn grain(&self) -> (i64, i32, i64) {
        (self.region_id, self.year, self.discharge_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationFact {
    pub region_id: i64,
    pub year: i32,
    pub population: f64,
}

impl PopulationFact {
    /// Grain: (region, year).
    pub fn grain(&self) -> (i64, i32) {
        (self.region_id, self.year)
    }
}
