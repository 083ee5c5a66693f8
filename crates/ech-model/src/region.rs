//! Administrative region hierarchy (NUTS-style codes).
//!
//! A region code's string length determines its level in the hierarchy:
//! 2 characters = country, 3 = level 1, 4 = level 2, 5 or more = level 3
//! and finer. The level is never stored independently of the code; it is
//! always recomputed so the two cannot drift apart.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hierarchy level of a region, derived from code length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionLevel {
    /// Country level (2-character ISO-style code).
    Country,
    /// First subdivision (3-character code).
    Level1,
    /// Second subdivision (4-character code).
    Level2,
    /// Third and finer subdivisions (5+ characters).
    Level3,
}

impl RegionLevel {
    /// Derive the level from a normalized region code.
    ///
    /// Returns `None` for codes shorter than a country code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.len() {
            0 | 1 => None,
            2 => Some(RegionLevel::Country),
            3 => Some(RegionLevel::Level1),
            4 => Some(RegionLevel::Level2),
            _ => Some(RegionLevel::Level3),
        }
    }

    /// Numeric form stored in the warehouse (0 = country .. 3 = finest).
    pub fn as_i64(self) -> i64 {
        match self {
            RegionLevel::Country => 0,
            RegionLevel::Level1 => 1,
            RegionLevel::Level2 => 2,
            RegionLevel::Level3 => 3,
        }
    }
}

impl fmt::Display for RegionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RegionLevel::Country => "country",
            RegionLevel::Level1 => "level-1",
            RegionLevel::Level2 => "level-2",
            RegionLevel::Level3 => "level-3+",
        };
        write!(f, "{label}")
    }
}

/// Normalize a raw region code: trim and uppercase.
///
/// Returns `None` when the trimmed code is too short to be a country code.
pub fn normalize_region_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_uppercase();
    RegionLevel::from_code(&code)?;
    Some(code)
}

/// A geographic unit in the shared region dimension.
///
/// Created once per distinct code encountered across any source, then only
/// enriched: a later source may fill a null attribute but never replaces a
/// populated one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Normalized hierarchical code, globally unique.
    pub code: String,
    /// Human-readable label, when a source provides one.
    pub label: Option<String>,
    /// Parent country ISO code.
    pub country_iso: Option<String>,
    /// Country display name.
    pub country_name: Option<String>,
}

impl Region {
    /// Build a region from a raw code, normalizing it first.
    pub fn new(raw_code: &str) -> Option<Self> {
        let code = normalize_region_code(raw_code)?;
        Some(Self {
            code,
            label: None,
            country_iso: None,
            country_name: None,
        })
    }

    /// Level derived from the code; a pure function of its length.
    pub fn level(&self) -> RegionLevel {
        // The constructor guarantees a valid code length.
        RegionLevel::from_code(&self.code).expect("region code validated on construction")
    }

    /// Fill null attributes from another sighting of the same code.
    ///
    /// Populated fields always win over later blanks.
    pub fn fill_gaps(
        &mut self,
        label: Option<&str>,
        country_iso: Option<&str>,
        country_name: Option<&str>,
    ) {
        fill(&mut self.label, label);
        fill(&mut self.country_iso, country_iso);
        fill(&mut self.country_name, country_name);
    }
}

fn fill(slot: &mut Option<String>, candidate: Option<&str>) {
    if slot.is_some() {
        return;
    }
    if let Some(value) = candidate {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            *slot = Some(trimmed.to_string());
        }
    }
}
