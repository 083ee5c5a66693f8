//! Measurement-cell parsing: missing-value sentinels and annotation flags.
//!
//! Statistical offices mark missing observations with a literal `:` and may
//! suffix observed values with letter flags (`123.4 e` for estimated,
//! `: c` for confidential-missing). A missing observation becomes an
//! explicit `None`, never zero; an unparseable cell is a per-row failure the
//! caller skips and counts.

/// Error for a cell that is neither a number nor a recognized sentinel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unparseable measurement: {0:?}")]
pub struct BadMeasurement(pub String);

/// The missing-value sentinel used by the statistical sources.
const MISSING_SENTINEL: &str = ":";

/// Parse a raw measurement cell.
///
/// Returns `Ok(None)` for empty cells and the `:` sentinel (with or without
/// trailing flags), `Ok(Some(v))` for numeric cells (flags stripped), and
/// `Err` otherwise.
pub fn parse_measurement(raw: &str) -> Result<Option<f64>, BadMeasurement> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    // Flags follow the value after whitespace; only the leading token counts.
    let token = trimmed.split_whitespace().next().unwrap_or("");
    if token == MISSING_SENTINEL {
        return Ok(None);
    }
    token
        .parse::<f64>()
        .map(Some)
        .map_err(|_| BadMeasurement(raw.to_string()))
}
