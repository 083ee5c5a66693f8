//! Adapter for Eurostat-style multi-dimension TSV files.
//!
//! Layout: the first column header is a comma-joined list of dimension
//! names ending in `geo\TIME_PERIOD`; each data cell in that column is the
//! matching comma-joined compound key. Every other column is one calendar
//! year. Values use `:` as the missing sentinel and may carry trailing
//! annotation flags.

use std::path::{Path, PathBuf};

use tracing::debug;

use ech_model::{CauseOfDeathRecord, DischargeRecord, PopulationRecord, SkipLog, normalize_region_code};

use crate::AdapterOutput;
use crate::error::{IngestError, Result};
use crate::pivot::{YearColumn, parse_year_header, year_columns};
use crate::table::{DelimitedTable, read_table};
use crate::values::parse_measurement;

/// Counters shared by every Eurostat scan.
#[derive(Debug, Default)]
struct ScanStats {
    rows_read: u64,
    missing: u64,
    skipped: SkipLog,
}

/// A parsed Eurostat TSV: dimension names, data rows, year columns.
pub struct EurostatTsv {
    path: PathBuf,
    dims: Vec<String>,
    table: DelimitedTable,
    years: Vec<YearColumn>,
}

impl EurostatTsv {
    pub fn open(path: &Path) -> Result<Self> {
        let table = read_table(path, b'\t')?;
        let compound = table.headers.first().cloned().unwrap_or_default();
        // `freq,unit,sex,age,icd10,geo\TIME_PERIOD` -> the trailing marker
        // identifies the region dimension.
        let dims: Vec<String> = compound
            .split(',')
            .map(|name| {
                let name = name.trim();
                match name.split_once('\\') {
                    Some((dim, _)) => dim.to_string(),
                    None => name.to_string(),
                }
            })
            .collect();
        let years = year_columns(&table.headers, parse_year_header);
        if years.is_empty() {
            return Err(IngestError::NoYearColumns {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            dims,
            table,
            years,
        })
    }

    pub fn dim_index(&self, name: &str) -> Option<usize> {
        self.dims
            .iter()
            .position(|dim| dim.eq_ignore_ascii_case(name))
    }

    fn require_dim(&self, name: &str) -> Result<usize> {
        self.dim_index(name).ok_or_else(|| IngestError::MissingColumn {
            path: self.path.clone(),
            column: name.to_string(),
        })
    }

    /// Walk the cube slice selected by `filters`, invoking `emit` once per
    /// observed (region, dimensions, year, value) cell. Rows outside the
    /// filter slice are passed over silently; malformed keys, invalid region
    /// codes, and unparseable values are skipped and counted; missing
    /// sentinels are counted and dropped. Filters on dimensions the file
    /// does not carry are ignored.
    fn scan<F>(&self, geo: usize, filters: &[(&str, &str)], stats: &mut ScanStats, mut emit: F)
    where
        F: FnMut(String, &[&str], i32, f64),
    {
        let active: Vec<(usize, &str)> = filters
            .iter()
            .filter_map(|(dim, value)| self.dim_index(dim).map(|idx| (idx, *value)))
            .collect();
        for row in &self.table.rows {
            stats.rows_read += 1;
            let compound = row.first().map(String::as_str).unwrap_or("");
            let parts: Vec<&str> = compound.split(',').map(str::trim).collect();
            if parts.len() != self.dims.len() {
                stats.skipped.skip("malformed dimension key", compound);
                continue;
            }
            if !active
                .iter()
                .all(|(idx, value)| parts[*idx].eq_ignore_ascii_case(value))
            {
                continue;
            }
            let Some(region_code) = normalize_region_code(parts[geo]) else {
                stats.skipped.skip("invalid region code", parts[geo]);
                continue;
            };
            for column in &self.years {
                let raw = row.get(column.index).map(String::as_str).unwrap_or("");
                match parse_measurement(raw) {
                    Ok(Some(value)) => emit(region_code.clone(), &parts, column.year, value),
                    Ok(None) => stats.missing += 1,
                    Err(_) => stats.skipped.skip("unparseable value", raw),
                }
            }
        }
    }
}

/// Annual, both-sexes, all-ages slice shared by the health datasets.
const HEALTH_FILTERS: [(&str, &str); 3] = [("freq", "A"), ("sex", "T"), ("age", "TOTAL")];

/// Read the age-standardized cause-of-death rates.
pub fn read_causes_of_death(path: &Path) -> Result<AdapterOutput<CauseOfDeathRecord>> {
    let tsv = EurostatTsv::open(path)?;
    let geo = tsv.require_dim("geo")?;
    let icd10 = tsv.require_dim("icd10")?;
    let mut stats = ScanStats::default();
    let mut records = Vec::new();
    tsv.scan(geo, &HEALTH_FILTERS, &mut stats, |region_code, parts, year, value| {
        records.push(CauseOfDeathRecord {
            region_code,
            year,
            cause: parts[icd10].to_string(),
            rate_per_100k: value,
        });
    });
    debug!(
        path = %path.display(),
        rows = stats.rows_read,
        records = records.len(),
        "read causes-of-death source"
    );
    Ok(output(records, stats))
}

/// Read the hospital-discharge counts.
pub fn read_hospital_discharges(path: &Path) -> Result<AdapterOutput<DischargeRecord>> {
    let tsv = EurostatTsv::open(path)?;
    let geo = tsv.require_dim("geo")?;
    let icd10 = tsv.require_dim("icd10")?;
    let mut stats = ScanStats::default();
    let mut records = Vec::new();
    tsv.scan(geo, &HEALTH_FILTERS, &mut stats, |region_code, parts, year, value| {
        records.push(DischargeRecord {
            region_code,
            year,
            discharge_group: parts[icd10].to_string(),
            count: value,
        });
    });
    debug!(
        path = %path.display(),
        rows = stats.rows_read,
        records = records.len(),
        "read hospital-discharge source"
    );
    Ok(output(records, stats))
}

/// Read the population registry (annual, both sexes, all ages, head count).
pub fn read_population(path: &Path) -> Result<AdapterOutput<PopulationRecord>> {
    let tsv = EurostatTsv::open(path)?;
    let geo = tsv.require_dim("geo")?;
    let filters = [
        ("freq", "A"),
        ("sex", "T"),
        ("age", "TOTAL"),
        ("unit", "NR"),
    ];
    let mut stats = ScanStats::default();
    let mut records = Vec::new();
    tsv.scan(geo, &filters, &mut stats, |region_code, _parts, year, value| {
        records.push(PopulationRecord {
            region_code,
            year,
            population: value,
        });
    });
    debug!(
        path = %path.display(),
        rows = stats.rows_read,
        records = records.len(),
        "read population source"
    );
    Ok(output(records, stats))
}

fn output<T>(records: Vec<T>, stats: ScanStats) -> AdapterOutput<T> {
    AdapterOutput {
        records,
        rows_read: stats.rows_read,
        missing: stats.missing,
        skipped: stats.skipped,
    }
}
