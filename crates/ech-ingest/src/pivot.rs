//! Declarative wide-to-long reshaping.
//!
//! Sources publish one column per year; downstream components want one
//! record per (keys, year). The pivot is a pure function over a table and
//! its recognized year columns, independent of any source format.

use crate::table::DelimitedTable;

/// A value column recognized as holding one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearColumn {
    pub index: usize,
    pub year: i32,
}

/// Parse a plain year header like `2019` (surrounding whitespace allowed).
pub fn parse_year_header(header: &str) -> Option<i32> {
    let trimmed = header.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

/// Parse a prefixed year header like `Y_2019`.
pub fn parse_prefixed_year_header(prefix: &str) -> impl Fn(&str) -> Option<i32> + '_ {
    move |header: &str| parse_year_header(header.trim().strip_prefix(prefix)?)
}

/// Recognize year columns among a table's headers.
pub fn year_columns<F>(headers: &[String], parse: F) -> Vec<YearColumn>
where
    F: Fn(&str) -> Option<i32>,
{
    headers
        .iter()
        .enumerate()
        .filter_map(|(index, header)| parse(header).map(|year| YearColumn { index, year }))
        .collect()
}

/// One cell of the melted table: the source row, the year its column
/// represents, and the raw cell text.
#[derive(Debug, Clone, Copy)]
pub struct MeltedCell<'t> {
    pub row_index: usize,
    pub row: &'t [String],
    pub year: i32,
    pub raw: &'t str,
}

/// Melt a wide table into one cell per (row, year column).
pub fn melt<'t>(
    table: &'t DelimitedTable,
    years: &'t [YearColumn],
) -> impl Iterator<Item = MeltedCell<'t>> {
    table.rows.iter().enumerate().flat_map(move |(row_index, row)| {
        years.iter().map(move |column| MeltedCell {
            row_index,
            row: row.as_slice(),
            year: column.year,
            raw: row.get(column.index).map(String::as_str).unwrap_or(""),
        })
    })
}
