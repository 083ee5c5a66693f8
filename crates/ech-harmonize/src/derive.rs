//! Derived metrics requiring a join against the population stream.

use std::collections::BTreeMap;

use ech_model::{DischargeFact, PopulationFact};

/// Fill `rate_per_100k` on discharge facts by left-joining population on
/// (region, year): `count * 100000 / population`.
///
/// Full floating precision is retained; rounding belongs to the
/// presentation layer. Where no positive population exists for the key, the
/// rate stays null and the raw count is preserved: partial information is
/// kept rather than dropping the fact.
pub fn apply_discharge_rates(discharges: &mut [DischargeFact], population: &[PopulationFact]) {
    let by_key: BTreeMap<(i64, i32), f64> = population
        .iter()
        .map(|fact| ((fact.region_id, fact.year), fact.population))
        .collect();
    for fact in discharges.iter_mut() {
        fact.rate_per_100k = by_key
            .get(&(fact.region_id, fact.year))
            .filter(|&&population| population > 0.0)
            .map(|&population| fact.count * 100_000.0 / population);
    }
}
