use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VocabError {
    #[error("failed to read vocabulary overrides {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse vocabulary overrides {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unmapped {dimension} code: {code}")]
    Unmapped { dimension: &'static str, code: String },

    #[error("unknown {dimension} group label: {label}")]
    UnknownGroup { dimension: &'static str, label: String },
}

pub type Result<T> = std::result::Result<T, VocabError>;
