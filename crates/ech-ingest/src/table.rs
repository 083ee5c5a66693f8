//! Delimited-table reading.
//!
//! Raw sources arrive as CSV/TSV with uneven shapes: preamble rows before
//! the header, ragged records, BOM-prefixed first cells. Reading produces a
//! uniform in-memory table of trimmed string cells; all typing happens in
//! the adapters.

use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{IngestError, Result};

#[derive(Debug, Clone)]
pub struct DelimitedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DelimitedTable {
    /// Case-insensitive header lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name.trim()))
    }

    /// Like [`column_index`], but a missing column is an error.
    pub fn require_column(&self, path: &Path, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| IngestError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    }
}

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    let mut parts = trimmed.split_whitespace();
    let mut normalized = String::new();
    if let Some(first) = parts.next() {
        normalized.push_str(first);
        for part in parts {
            normalized.push(' ');
            normalized.push_str(part);
        }
    }
    normalized
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

/// Read every non-empty row of a delimited file as normalized string cells.
pub fn read_rows(path: &Path, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let row: Vec<String> = record.iter().map(normalize_cell).collect();
        if row.iter().all(|value| value.is_empty()) {
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Build a table from raw rows with the header at a known index. Data rows
/// are padded/truncated to the header width so ragged records stay aligned.
pub fn table_with_header_at(raw_rows: Vec<Vec<String>>, header_index: usize) -> DelimitedTable {
    let headers: Vec<String> = raw_rows
        .get(header_index)
        .map(|row| row.iter().map(|value| normalize_header(value)).collect())
        .unwrap_or_default();
    let mut rows = Vec::new();
    for record in raw_rows.into_iter().skip(header_index + 1) {
        let mut row = Vec::with_capacity(headers.len());
        for idx in 0..headers.len() {
            row.push(record.get(idx).cloned().unwrap_or_default());
        }
        rows.push(row);
    }
    DelimitedTable { headers, rows }
}

/// Read a table whose first row is the header.
pub fn read_table(path: &Path, delimiter: u8) -> Result<DelimitedTable> {
    let rows = read_rows(path, delimiter)?;
    Ok(table_with_header_at(rows, 0))
}

/// Find the header row by scanning for a known column name, skipping any
/// preamble rows a workbook export may carry.
pub fn find_header_row(raw_rows: &[Vec<String>], marker_column: &str) -> Option<usize> {
    raw_rows.iter().position(|row| {
        row.iter()
            .any(|cell| normalize_header(cell).eq_ignore_ascii_case(marker_column))
    })
}
