//! Emission-sector vocabulary.
//!
//! Maps raw source sector strings to a canonical name and one of a fixed,
//! closed set of sector groups. A raw string absent from the table is an
//! error surfaced to the caller: a sector silently excluded would corrupt
//! aggregate totals downstream.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VocabError;

/// Closed taxonomy of sector groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorGroup {
    Agriculture,
    Buildings,
    Energy,
    Industry,
    Transport,
    Waste,
    Other,
}

impl SectorGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectorGroup::Agriculture => "agriculture",
            SectorGroup::Buildings => "buildings",
            SectorGroup::Energy => "energy",
            SectorGroup::Industry => "industry",
            SectorGroup::Transport => "transport",
            SectorGroup::Waste => "waste",
            SectorGroup::Other => "other",
        }
    }
}

impl fmt::Display for SectorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SectorGroup {
    type Err = VocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "agriculture" => Ok(SectorGroup::Agriculture),
            "buildings" => Ok(SectorGroup::Buildings),
            "energy" => Ok(SectorGroup::Energy),
            "industry" => Ok(SectorGroup::Industry),
            "transport" => Ok(SectorGroup::Transport),
            "waste" => Ok(SectorGroup::Waste),
            "other" => Ok(SectorGroup::Other),
            other => Err(VocabError::UnknownGroup {
                dimension: "sector",
                label: other.to_string(),
            }),
        }
    }
}

/// Canonical identity of one raw sector code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorEntry {
    /// Canonical code stored in the dimension (the raw code, trimmed).
    pub code: String,
    pub name: String,
    pub group: SectorGroup,
}

/// Lookup from raw source string (case-insensitive) to canonical sector.
#[derive(Debug, Clone, Default)]
pub struct SectorVocabulary {
    entries: BTreeMap<String, SectorEntry>,
}

impl SectorVocabulary {
    /// The built-in table covering the emissions-inventory sector codes.
    pub fn builtin() -> Self {
        let mut vocab = Self::default();
        for (raw, name, group) in [
            ("Agriculture", "Agriculture", SectorGroup::Agriculture),
            ("Buildings", "Buildings", SectorGroup::Buildings),
            ("Energy", "Energy", SectorGroup::Energy),
            ("Industry", "Industry", SectorGroup::Industry),
            ("Transport", "Transport", SectorGroup::Transport),
            ("Dom_Avi", "Domestic aviation", SectorGroup::Transport),
            ("Dom_Ship", "Domestic shipping", SectorGroup::Transport),
            ("Waste", "Waste", SectorGroup::Waste),
        ] {
            vocab.insert(raw, name, group);
        }
        vocab
    }

    /// Add or replace a mapping for a raw code.
    pub fn insert(&mut self, raw: &str, name: &str, group: SectorGroup) {
        let code = raw.trim().to_string();
        self.entries.insert(
            code.to_uppercase(),
            SectorEntry {
                code,
                name: name.to_string(),
                group,
            },
        );
    }

    /// Look up a raw code; `None` means unmapped.
    pub fn get(&self, raw: &str) -> Option<&SectorEntry> {
        self.entries.get(&raw.trim().to_uppercase())
    }

    pub fn resolve(&self, raw: &str) -> Result<&SectorEntry, VocabError> {
        self.get(raw).ok_or_else(|| VocabError::Unmapped {
            dimension: "sector",
            code: raw.trim().to_string(),
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &SectorEntry> {
        self.entries.values()
    }
}
