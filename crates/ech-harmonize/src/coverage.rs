//! Temporal coverage recomputation.
//!
//! Availability flags are a pure function of the current fact contents,
//! recomputed in full after every load. Nothing is mutated incrementally,
//! so the flags cannot drift from the data they describe.

use std::collections::BTreeSet;

use ech_model::{TimePeriod, YearCoverage};

/// Per-family sets of years that currently hold at least one fact row.
/// `health` is the union of the cause-of-death and hospital-discharge
/// streams.
#[derive(Debug, Clone, Default)]
pub struct FamilyYears {
    pub emissions: BTreeSet<i32>,
    pub health: BTreeSet<i32>,
    pub population: BTreeSet<i32>,
}

impl FamilyYears {
    /// Contiguous span from the earliest to the latest year any family
    /// touches. The time dimension always covers the union; a short stream
    /// never truncates it.
    pub fn span(&self) -> Option<std::ops::RangeInclusive<i32>> {
        let min = [&self.emissions, &self.health, &self.population]
            .iter()
            .filter_map(|set| set.first())
            .min()
            .copied()?;
        let max = [&self.emissions, &self.health, &self.population]
            .iter()
            .filter_map(|set| set.last())
            .max()
            .copied()?;
        Some(min..=max)
    }
}

/// Compute the full time dimension with availability flags.
///
/// Idempotent: the output depends only on the input sets, so recomputing
/// with unchanged facts yields the identical rows.
pub fn compute_coverage(years: &FamilyYears) -> Vec<TimePeriod> {
    let Some(span) = years.span() else {
        return Vec::new();
    };
    span.map(|year| TimePeriod {
        year,
        coverage: YearCoverage {
            emissions: years.emissions.contains(&year),
            health: years.health.contains(&year),
            population: years.population.contains(&year),
        },
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_is_union_not_intersection() {
        let years = FamilyYears {
            emissions: BTreeSet::from([1990, 2000]),
            health: BTreeSet::from([2011, 2012]),
            population: BTreeSet::from([2014]),
        };
        assert_eq!(years.span(), Some(1990..=2014));
        let coverage = compute_coverage(&years);
        assert_eq!(coverage.len(), 25);
        // Flags only where that family has facts.
        let y1990 = &coverage[0];
        assert!(y1990.coverage.emissions);
        assert!(!y1990.coverage.health);
        assert!(!y1990.coverage.population);
        let y2011 = coverage.iter().find(|p| p.year == 2011).unwrap();
        assert!(y2011.coverage.health);
        assert!(!y2011.coverage.emissions);
        // Gap years exist in the dimension with all flags false.
        let y1995 = coverage.iter().find(|p| p.year == 1995).unwrap();
        assert_eq!(y1995.coverage, YearCoverage::default());
    }

    #[test]
    fn recomputation_is_idempotent() {
        let years = FamilyYears {
            emissions: BTreeSet::from([2019, 2020]),
            health: BTreeSet::new(),
            population: BTreeSet::from([2020]),
        };
        assert_eq!(compute_coverage(&years), compute_coverage(&years));
    }

    #[test]
    fn empty_input_yields_empty_dimension() {
        assert!(compute_coverage(&FamilyYears::default()).is_empty());
    }
}
