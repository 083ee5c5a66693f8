//! TOML vocabulary overrides.
//!
//! When a load aborts on unmapped codes, the caller extends the vocabulary
//! here and retries; the built-in tables are never edited in place.
//!
//! ```toml
//! [sectors.Power_Industry]
//! name = "Power industry"
//! group = "energy"
//!
//! [gases.SF6]
//! kind = "fluorinated_gases"
//!
//! [icd10.K00-K95]
//! name = "Digestive diseases"
//! category = "other"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::VocabError;
use crate::gas::GasKind;
use crate::icd10::CauseCategory;
use crate::{GasVocabulary, Icd10Vocabulary, SectorVocabulary};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VocabOverrides {
    #[serde(default)]
    pub sectors: BTreeMap<String, SectorOverride>,
    #[serde(default)]
    pub gases: BTreeMap<String, GasOverride>,
    #[serde(default)]
    pub icd10: BTreeMap<String, Icd10Override>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectorOverride {
    pub name: String,
    pub group: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GasOverride {
    pub kind: GasKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Icd10Override {
    pub name: String,
    pub category: String,
}

impl VocabOverrides {
    pub fn load(path: &Path) -> Result<Self, VocabError> {
        let text = std::fs::read_to_string(path).map_err(|source| VocabError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| VocabError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply the overrides on top of the given vocabularies.
    pub fn apply(
        &self,
        sectors: &mut SectorVocabulary,
        gases: &mut GasVocabulary,
        icd10: &mut Icd10Vocabulary,
    ) -> Result<(), VocabError> {
        for (raw, entry) in &self.sectors {
            sectors.insert(raw, &entry.name, entry.group.parse()?);
        }
        for (raw, entry) in &self.gases {
            gases.insert(raw, entry.kind);
        }
        for (raw, entry) in &self.icd10 {
            let category: CauseCategory = entry.category.parse()?;
            icd10.insert(raw, &entry.name, category);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_parse_and_apply() {
        let overrides: VocabOverrides = toml::from_str(
            r#"
            [sectors.Power_Industry]
            name = "Power industry"
            group = "energy"

            [gases.SF6]
            kind = "fluorinated_gases"

            [icd10.K00-K95]
            name = "Digestive diseases"
            category = "other"
            "#,
        )
        .unwrap();

        let mut sectors = SectorVocabulary::builtin();
        let mut gases = GasVocabulary::builtin();
        let mut icd10 = Icd10Vocabulary::builtin();
        overrides.apply(&mut sectors, &mut gases, &mut icd10).unwrap();

        assert_eq!(sectors.get("power_industry").unwrap().name, "Power industry");
        assert_eq!(gases.get("SF6"), Some(GasKind::FluorinatedGases));
        assert_eq!(icd10.get("K00-K95").unwrap().category, CauseCategory::Other);
    }

    #[test]
    fn bad_group_label_is_rejected() {
        let overrides: VocabOverrides = toml::from_str(
            r#"
            [sectors.X]
            name = "X"
            group = "not-a-group"
            "#,
        )
        .unwrap();
        let mut sectors = SectorVocabulary::builtin();
        let mut gases = GasVocabulary::builtin();
        let mut icd10 = Icd10Vocabulary::builtin();
        let err = overrides
            .apply(&mut sectors, &mut gases, &mut icd10)
            .unwrap_err();
        assert!(matches!(err, VocabError::UnknownGroup { .. }));
    }
}
