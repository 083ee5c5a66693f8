pub mod error;
pub mod gas;
pub mod icd10;
pub mod overrides;
pub mod sector;

pub use error::{Result, VocabError};
pub use gas::{GasKind, GasVocabulary};
pub use icd10::{CauseCategory, Icd10Entry, Icd10Vocabulary};
pub use overrides::VocabOverrides;
pub use sector::{SectorEntry, SectorGroup, SectorVocabulary};

use std::path::Path;

/// The full set of closed vocabularies used by the reconciler.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub sectors: SectorVocabulary,
    pub gases: GasVocabulary,
    /// Shared by the cause-of-death and hospital-discharge dimensions.
    pub icd10: Icd10Vocabulary,
}

impl Vocabulary {
    pub fn builtin() -> Self {
        Self {
            sectors: SectorVocabulary::builtin(),
            gases: GasVocabulary::builtin(),
            icd10: Icd10Vocabulary::builtin(),
        }
    }

    /// Built-in tables extended with overrides from a TOML file.
    pub fn with_overrides(path: &Path) -> Result<Self> {
        let mut vocab = Self::builtin();
        let overrides = VocabOverrides::load(path)?;
        overrides.apply(&mut vocab.sectors, &mut vocab.gases, &mut vocab.icd10)?;
        Ok(vocab)
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}
