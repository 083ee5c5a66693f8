use ech_model::FactFamily;

#[derive(Debug, thiserror::Error)]
pub enum HarmonizeError {
    /// Raw codes absent from the closed vocabulary. Load-blocking for the
    /// batch: silently excluding a sector or gas would corrupt aggregates.
    #[error("unmapped {dimension} codes in batch: {}", .codes.join(", "))]
    UnmappedVocabulary {
        dimension: &'static str,
        codes: Vec<String>,
    },

    /// The same grain key appeared more than once within one batch.
    #[error("{family}: {count} duplicate grain keys (e.g. {})", .sample.join("; "))]
    DuplicateGrain {
        family: FactFamily,
        count: u64,
        sample: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, HarmonizeError>;
