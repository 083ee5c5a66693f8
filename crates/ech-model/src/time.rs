//! Calendar-year time dimension.
//!
//! One row per year across the union of all fact streams' spans; a stream
//! with a shorter span never truncates the dimension. Availability flags are
//! derived from fact contents after every load, never mutated incrementally.

use serde::{Deserialize, Serialize};

/// Decade for a year, rounded down to the nearest 10.
pub fn decade(year: i32) -> i32 {
    year.div_euclid(10) * 10
}

/// Gregorian leap-year rule.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Per-year, per-fact-family availability flags.
///
/// `health` covers both the cause-of-death and hospital-discharge streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCoverage {
    pub emissions: bool,
    pub health: bool,
    pub population: bool,
}

/// A row of the time dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub year: i32,
    pub coverage: YearCoverage,
}

impl TimePeriod {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            coverage: YearCoverage::default(),
        }
    }

    pub fn decade(&self) -> i32 {
        decade(self.year)
    }

    pub fn year_label(&self) -> String {
        self.year.to_string()
    }

    pub fn is_leap_year(&self) -> bool {
        is_leap_year(self.year)
    }
}
