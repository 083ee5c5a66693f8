//! ICD-10 group vocabulary, shared by the cause-of-death and
//! hospital-discharge dimensions.
//!
//! Health registries report against ICD-10 *groups* (ranges like `J12-J18`,
//! aggregates like `A-R_V-Y`), not individual codes. The classifier below
//! covers the groups the registries publish; a code it cannot place is an
//! explicit unmapped error rather than a pass-through.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VocabError;

/// Closed set of diagnosis categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CauseCategory {
    AllCauses,
    AllConditions,
    Respiratory,
    Infectious,
    Neoplasms,
    Circulatory,
    ExternalCauses,
    Other,
}

impl CauseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CauseCategory::AllCauses => "all_causes",
            CauseCategory::AllConditions => "all_conditions",
            CauseCategory::Respiratory => "respiratory",
            CauseCategory::Infectious => "infectious",
            CauseCategory::Neoplasms => "neoplasms",
            CauseCategory::Circulatory => "circulatory",
            CauseCategory::ExternalCauses => "external_causes",
            CauseCategory::Other => "other",
        }
    }
}

impl fmt::Display for CauseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CauseCategory {
    type Err = VocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all_causes" => Ok(CauseCategory::AllCauses),
            "all_conditions" => Ok(CauseCategory::AllConditions),
            "respiratory" => Ok(CauseCategory::Respiratory),
            "infectious" => Ok(CauseCategory::Infectious),
            "neoplasms" => Ok(CauseCategory::Neoplasms),
            "circulatory" => Ok(CauseCategory::Circulatory),
            "external_causes" => Ok(CauseCategory::ExternalCauses),
            "other" => Ok(CauseCategory::Other),
            other => Err(VocabError::UnknownGroup {
                dimension: "icd10",
                label: other.to_string(),
            }),
        }
    }
}

/// Canonical identity of one ICD-10 group code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icd10Entry {
    /// Normalized group code as stored in the dimension.
    pub code: String,
    pub name: String,
    pub category: CauseCategory,
}

impl Icd10Entry {
    pub fn is_respiratory(&self) -> bool {
        self.category == CauseCategory::Respiratory
    }
}

/// Lookup from raw ICD-10 group code to canonical identity.
#[derive(Debug, Clone, Default)]
pub struct Icd10Vocabulary {
    /// Exact-code entries (built-in named groups plus overrides).
    entries: BTreeMap<String, Icd10Entry>,
}

impl Icd10Vocabulary {
    pub fn builtin() -> Self {
        let mut vocab = Self::default();
        for (code, name, category) in [
            ("A-R_V-Y", "All causes of death", CauseCategory::AllCauses),
            (
                "A-T_Z",
                "All diseases and health factors (A-T, Z)",
                CauseCategory::AllConditions,
            ),
            ("J", "All respiratory diseases", CauseCategory::Respiratory),
            (
                "J00-J11",
                "Acute upper respiratory infections",
                CauseCategory::Respiratory,
            ),
            ("J09-J11", "Influenza", CauseCategory::Respiratory),
            ("J12-J18", "Pneumonia", CauseCategory::Respiratory),
            (
                "J20-J22",
                "Other acute lower respiratory infections",
                CauseCategory::Respiratory,
            ),
            (
                "J40-J44",
                "Chronic lower respiratory diseases (COPD)",
                CauseCategory::Respiratory,
            ),
            (
                "J40-J44_J47",
                "Chronic lower respiratory diseases (COPD)",
                CauseCategory::Respiratory,
            ),
            ("J45_J46", "Asthma", CauseCategory::Respiratory),
            (
                "J60-J99",
                "Other respiratory diseases",
                CauseCategory::Respiratory,
            ),
            ("A15-A19", "Tuberculosis", CauseCategory::Infectious),
            ("A40_A41", "Sepsis", CauseCategory::Infectious),
            ("B15-B19", "Viral hepatitis", CauseCategory::Infectious),
            ("C", "All neoplasms", CauseCategory::Neoplasms),
            ("I", "All circulatory diseases", CauseCategory::Circulatory),
            (
                "I20-I25",
                "Ischaemic heart diseases",
                CauseCategory::Circulatory,
            ),
            (
                "I60-I69",
                "Cerebrovascular diseases",
                CauseCategory::Circulatory,
            ),
            ("ACC", "Accidents", CauseCategory::ExternalCauses),
        ] {
            vocab.insert(code, name, category);
        }
        vocab
    }

    pub fn insert(&mut self, code: &str, name: &str, category: CauseCategory) {
        let code = code.trim().to_uppercase();
        self.entries.insert(
            code.clone(),
            Icd10Entry {
                code,
                name: name.to_string(),
                category,
            },
        );
    }

    /// Look up a raw group code; `None` means unmapped.
    ///
    /// An `_OTH` suffix ("other" remainder groups) resolves through its base
    /// group with " (other)" appended to the name.
    pub fn get(&self, raw: &str) -> Option<Icd10Entry> {
        let code = raw.trim().to_uppercase();
        if code.is_empty() {
            return None;
        }
        if let Some(entry) = self.entries.get(&code) {
            return Some(entry.clone());
        }
        // Variants of the all-conditions aggregate (e.g. A-T_Z_XNB).
        if code.starts_with("A-T_Z") {
            return Some(Icd10Entry {
                code: code.clone(),
                name: "All diseases and health factors (A-T, Z)".to_string(),
                category: CauseCategory::AllConditions,
            });
        }
        if let Some(base) = code.strip_suffix("_OTH")
            && let Some(entry) = self.entries.get(base)
        {
            return Some(Icd10Entry {
                code: code.clone(),
                name: format!("{} (other)", entry.name),
                category: entry.category,
            });
        }
        self.classify_by_chapter(&code)
    }

    pub fn resolve(&self, raw: &str) -> Result<Icd10Entry, VocabError> {
        self.get(raw).ok_or_else(|| VocabError::Unmapped {
            dimension: "icd10",
            code: raw.trim().to_string(),
        })
    }

    /// Chapter-letter fallback for range codes without a named entry.
    fn classify_by_chapter(&self, code: &str) -> Option<Icd10Entry> {
        let first = code.chars().next()?;
        if !code
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        {
            return None;
        }
        let (name, category) = match first {
            'J' => (
                format!("Respiratory disease ({code})"),
                CauseCategory::Respiratory,
            ),
            'A' | 'B' => (
                format!("Infectious disease ({code})"),
                CauseCategory::Infectious,
            ),
            'C' | 'D' => (format!("Neoplasm ({code})"), CauseCategory::Neoplasms),
            'I' => (
                format!("Circulatory disease ({code})"),
                CauseCategory::Circulatory,
            ),
            'V' | 'W' | 'X' | 'Y' => (
                format!("External causes ({code})"),
                CauseCategory::ExternalCauses,
            ),
            _ => return None,
        };
        Some(Icd10Entry {
            code: code.to_string(),
            name,
            category,
        })
    }
}
