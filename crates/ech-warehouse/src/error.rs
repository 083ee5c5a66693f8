#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Hard constraint: a committed fact would reference a missing
    /// dimension row. The offending batch is rolled back.
    #[error(
        "referential integrity violated: {count} {fact_table} rows reference missing {dimension} keys"
    )]
    ForeignKey {
        fact_table: &'static str,
        dimension: &'static str,
        count: u64,
    },
}

pub type Result<T> = std::result::Result<T, WarehouseError>;
