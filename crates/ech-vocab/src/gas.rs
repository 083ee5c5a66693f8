//! Greenhouse-gas vocabulary.
//!
//! Emissions sources label the same four gas families many ways
//! (`fossil_co2`, `CO2`, `GWP_100_AR5_CH4`, `F-gases`, ...). Every raw label
//! resolves to one of four canonical gases, or to an explicit unmapped
//! error. Values are already CO2-equivalent in the emissions family, so the
//! GWP factor is a dimension attribute, not a load-time multiplier.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VocabError;

/// The four canonical gas families of the emissions inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GasKind {
    CarbonDioxide,
    Methane,
    NitrousOxide,
    FluorinatedGases,
}

impl GasKind {
    pub fn code(&self) -> &'static str {
        match self {
            GasKind::CarbonDioxide => "CO2",
            GasKind::Methane => "CH4",
            GasKind::NitrousOxide => "N2O",
            GasKind::FluorinatedGases => "F-GAS",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GasKind::CarbonDioxide => "Carbon Dioxide",
            GasKind::Methane => "Methane",
            GasKind::NitrousOxide => "Nitrous Oxide",
            GasKind::FluorinatedGases => "Fluorinated Gases",
        }
    }

    pub fn formula(&self) -> &'static str {
        match self {
            GasKind::CarbonDioxide => "CO₂",
            GasKind::Methane => "CH₄",
            GasKind::NitrousOxide => "N₂O",
            GasKind::FluorinatedGases => "F-gases",
        }
    }

    /// AR5 100-year global warming potential. F-gases are a family with
    /// widely varying GWPs; the aggregate uses a representative value.
    pub fn gwp_ar5(&self) -> f64 {
        match self {
            GasKind::CarbonDioxide => 1.0,
            GasKind::Methane => 28.0,
            GasKind::NitrousOxide => 265.0,
            GasKind::FluorinatedGases => 1000.0,
        }
    }
}

impl fmt::Display for GasKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Lookup from raw gas label to canonical gas.
#[derive(Debug, Clone, Default)]
pub struct GasVocabulary {
    /// Exact raw labels added via overrides, checked before classification.
    overrides: BTreeMap<String, GasKind>,
}

impl GasVocabulary {
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Pin a raw label to a gas, bypassing substring classification.
    pub fn insert(&mut self, raw: &str, kind: GasKind) {
        self.overrides.insert(raw.trim().to_uppercase(), kind);
    }

    /// Resolve a raw label. Substance markers are checked most-specific
    /// first so composite labels like `GWP_100_AR5_CH4` land on methane
    /// rather than falling through to CO2.
    pub fn get(&self, raw: &str) -> Option<GasKind> {
        let upper = raw.trim().to_uppercase();
        if upper.is_empty() {
            return None;
        }
        if let Some(kind) = self.overrides.get(&upper) {
            return Some(*kind);
        }
        if upper.contains("CH4") || upper.contains("METHANE") {
            Some(GasKind::Methane)
        } else if upper.contains("N2O") || upper.contains("NITROUS") {
            Some(GasKind::NitrousOxide)
        } else if upper.contains("F-GAS") || upper.contains("F_GAS") || upper.contains("FLUORINATED")
        {
            Some(GasKind::FluorinatedGases)
        } else if upper.contains("CO2") || upper.contains("CARBON") {
            Some(GasKind::CarbonDioxide)
        } else {
            None
        }
    }

    pub fn resolve(&self, raw: &str) -> Result<GasKind, VocabError> {
        self.get(raw).ok_or_else(|| VocabError::Unmapped {
            dimension: "gas",
            code: raw.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_source_label_variants() {
        let vocab = GasVocabulary::builtin();
        assert_eq!(vocab.get("fossil_co2"), Some(GasKind::CarbonDioxide));
        assert_eq!(vocab.get("GWP_100_AR5_CH4"), Some(GasKind::Methane));
        assert_eq!(vocab.get("n2o"), Some(GasKind::NitrousOxide));
        assert_eq!(vocab.get("F-gases"), Some(GasKind::FluorinatedGases));
        assert_eq!(vocab.get("f_gas"), Some(GasKind::FluorinatedGases));
    }

    #[test]
    fn methane_wins_over_co2_in_composite_labels() {
        let vocab = GasVocabulary::builtin();
        // A label naming both equivalence basis and substance.
        assert_eq!(vocab.get("CO2E_CH4"), Some(GasKind::Methane));
    }

    #[test]
    fn unknown_gas_is_an_error() {
        let vocab = GasVocabulary::builtin();
        let err = vocab.resolve("UNKNOWNGAS").unwrap_err();
        assert!(matches!(err, VocabError::Unmapped { dimension: "gas", .. }));
    }

    #[test]
    fn override_beats_classification() {
        let mut vocab = GasVocabulary::builtin();
        vocab.insert("SF6", GasKind::FluorinatedGases);
        assert_eq!(vocab.get("sf6"), Some(GasKind::FluorinatedGases));
    }
}
