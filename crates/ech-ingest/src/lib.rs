pub mod emissions;
pub mod error;
pub mod eurostat;
pub mod pivot;
pub mod table;
pub mod values;

pub use emissions::{EmissionsSource, read_emissions};
pub use error::{IngestError, Result};
pub use eurostat::{EurostatTsv, read_causes_of_death, read_hospital_discharges, read_population};
pub use pivot::{MeltedCell, YearColumn, melt, parse_prefixed_year_header, parse_year_header, year_columns};
pub use table::{DelimitedTable, find_header_row, read_rows, read_table, table_with_header_at};
pub use values::{BadMeasurement, parse_measurement};

use ech_model::SkipLog;

/// What an adapter hands downstream: tidy records plus accounting for the
/// run report. `missing` counts sentinel nulls dropped by design; `skipped`
/// counts rows/cells dropped because they could not be parsed.
#[derive(Debug, Clone)]
pub struct AdapterOutput<T> {
    pub records: Vec<T>,
    pub rows_read: u64,
    pub missing: u64,
    pub skipped: SkipLog,
}

impl<T> Default for AdapterOutput<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rows_read: 0,
            missing: 0,
            skipped: SkipLog::new(),
        }
    }
}
