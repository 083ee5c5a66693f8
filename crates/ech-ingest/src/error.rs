use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: no header row found (expected a row containing column {column:?})")]
    HeaderNotFound { path: PathBuf, column: String },

    #[error("{path}: missing required column {column:?}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}: no year columns found")]
    NoYearColumns { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, IngestError>;
