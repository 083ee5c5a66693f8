//! Adapter for emissions-inventory workbook exports.
//!
//! One file per gas sheet: a few preamble rows, then a header with metadata
//! columns (substance, ISO, country, region code, region label, sector) and
//! wide `Y_<year>` value columns. Values are kilotonnes CO2-equivalent
//! throughout the family; a blank substance cell falls back to the sheet's
//! gas label.

use std::path::{Path, PathBuf};

use tracing::debug;

use ech_model::EmissionRecord;

use crate::AdapterOutput;
use crate::error::{IngestError, Result};
use crate::pivot::{melt, parse_prefixed_year_header, year_columns};
use crate::table::{find_header_row, read_rows, table_with_header_at};
use crate::values::parse_measurement;

/// The region-code column also marks the header row in preamble-bearing
/// exports.
const REGION_COLUMN: &str = "NUTS 2";

/// One per-gas sheet export.
#[derive(Debug, Clone)]
pub struct EmissionsSource {
    pub path: PathBuf,
    /// Gas label of the sheet, used when a row's substance cell is blank.
    pub gas_label: String,
}

/// Read one or more sheet exports into tidy emission records.
pub fn read_emissions(sources: &[EmissionsSource]) -> Result<AdapterOutput<EmissionRecord>> {
    let mut out = AdapterOutput::default();
    for source in sources {
        read_sheet(source, &mut out)?;
    }
    Ok(out)
}

fn read_sheet(source: &EmissionsSource, out: &mut AdapterOutput<EmissionRecord>) -> Result<()> {
    let path = source.path.as_path();
    let raw_rows = read_rows(path, b',')?;
    let header_index =
        find_header_row(&raw_rows, REGION_COLUMN).ok_or_else(|| IngestError::HeaderNotFound {
            path: path.to_path_buf(),
            column: REGION_COLUMN.to_string(),
        })?;
    let table = table_with_header_at(raw_rows, header_index);

    let substance = table.require_column(path, "Substance")?;
    let iso = table.require_column(path, "ISO")?;
    let country = table.require_column(path, "Country")?;
    let region = table.require_column(path, REGION_COLUMN)?;
    let region_label = table.require_column(path, "NUTS 2 desc")?;
    let sector = table.require_column(path, "Sector")?;

    let years = year_columns(&table.headers, parse_prefixed_year_header("Y_"));
    if years.is_empty() {
        return Err(IngestError::NoYearColumns {
            path: path.to_path_buf(),
        });
    }

    out.rows_read += table.rows.len() as u64;
    let mut records = 0usize;
    for cell in melt(&table, &years) {
        let raw_region = &cell.row[region];
        let Some(region_code) = ech_model::normalize_region_code(raw_region) else {
            // One skip per cell keeps the count aligned with dropped values.
            out.skipped.skip("invalid region code", raw_region);
            continue;
        };
        let value = match parse_measurement(cell.raw) {
            Ok(Some(value)) => value,
            Ok(None) => {
                out.missing += 1;
                continue;
            }
            Err(_) => {
                out.skipped.skip("unparseable value", cell.raw);
                continue;
            }
        };
        let gas = non_empty(&cell.row[substance]).unwrap_or(&source.gas_label);
        out.records.push(EmissionRecord {
            region_code,
            region_label: non_empty(&cell.row[region_label]).map(str::to_string),
            country_iso: non_empty(&cell.row[iso]).map(|iso| iso.to_uppercase()),
            country_name: non_empty(&cell.row[country]).map(str::to_string),
            year: cell.year,
            sector: cell.row[sector].clone(),
            gas: gas.to_string(),
            value_kt: value,
        });
        records += 1;
    }
    debug!(
        path = %path.display(),
        gas = %source.gas_label,
        records,
        "read emissions sheet"
    );
    Ok(())
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}
