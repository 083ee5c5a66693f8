//! Transactional batch loading.
//!
//! Order within a batch: dimension upserts, then fact upserts (foreign keys
//! must already resolve), in a single transaction that either fully commits
//! or fully rolls back. Coverage flags and derived discharge rates are
//! recomputed from store contents after batches commit, never mutated
//! incrementally.

use rusqlite::{Transaction, params};
use tracing::info;

use ech_harmonize::{EmissionsDimensions, Icd10Dimensions, RegionCatalog, apply_discharge_rates};
use ech_model::{
    CauseOfDeathFact, DischargeFact, EmissionsFact, PopulationFact, TimePeriod, is_leap_year,
    surrogate_key,
};
use crate::error::Result;
use crate::store::Warehouse;

/// Counts for one committed batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadStats {
    pub facts: u64,
}

fn upsert_regions(tx: &Transaction<'_>, regions: &RegionCatalog) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO dim_region (region_id, region_code, region_label, region_level, country_iso, country_name)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(region_id) DO UPDATE SET
             region_label = COALESCE(region_label, excluded.region_label),
             country_iso = COALESCE(country_iso, excluded.country_iso),
             country_name = COALESCE(country_name, excluded.country_name)",
    )?;
    for region in regions.regions() {
        stmt.execute(params![
            surrogate_key("region", &region.code),
            region.code,
            region.label,
            region.level().as_i64(),
            region.country_iso,
            region.country_name,
        ])?;
    }
    Ok(())
}

fn upsert_time(tx: &Transaction<'_>, periods: &[TimePeriod]) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO dim_time (year, decade, year_label, is_leap_year)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(year) DO NOTHING",
    )?;
    for period in periods {
        stmt.execute(params![
            period.year,
            period.decade(),
            period.year_label(),
            is_leap_year(period.year),
        ])?;
    }
    Ok(())
}

fn upsert_sectors(tx: &Transaction<'_>, dims: &EmissionsDimensions) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO dim_sector (sector_id, sector_code, sector_name, sector_group)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(sector_id) DO UPDATE SET
             sector_name = excluded.sector_name,
             sector_group = excluded.sector_group",
    )?;
    for sector in dims.sectors.values() {
        stmt.execute(params![
            surrogate_key("sector", &sector.code),
            sector.code,
            sector.name,
            sector.group.as_str(),
        ])?;
    }
    Ok(())
}

fn upsert_gases(tx: &Transaction<'_>, dims: &EmissionsDimensions) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO dim_gas (gas_id, gas_code, gas_name, gas_formula, gwp_ar5)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(gas_id) DO UPDATE SET
             gas_name = excluded.gas_name,
             gas_formula = excluded.gas_formula,
             gwp_ar5 = excluded.gwp_ar5",
    )?;
    for gas in &dims.gases {
        stmt.execute(params![
            surrogate_key("gas", gas.code()),
            gas.code(),
            gas.name(),
            gas.formula(),
            gas.gwp_ar5(),
        ])?;
    }
    Ok(())
}

fn upsert_icd10(
    tx: &Transaction<'_>,
    table: &str,
    namespace: &str,
    dims: &Icd10Dimensions,
) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare_cached(&format!(
        "INSERT INTO {table} ({namespace}_id, {namespace}_code, {namespace}_name, {namespace}_category, is_respiratory)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT({namespace}_id) DO UPDATE SET
             {namespace}_name = excluded.{namespace}_name,
             {namespace}_category = excluded.{namespace}_category,
             is_respiratory = excluded.is_respiratory"
    ))?;
    for entry in dims.entries.values() {
        stmt.execute(params![
            surrogate_key(namespace, &entry.code),
            entry.code,
            entry.name,
            entry.category.as_str(),
            entry.is_respiratory(),
        ])?;
    }
    Ok(())
}

impl Warehouse {
    /// Load one emissions batch: region/time/sector/gas upserts, then fact
    /// upserts at grain (region, year, sector, gas). A re-run over the same
    /// key overwrites the measurement; it never duplicates the row.
    pub fn load_emissions_batch(
        &mut self,
        regions: &RegionCatalog,
        time: &[TimePeriod],
        dims: &EmissionsDimensions,
        facts: &[EmissionsFact],
    ) -> Result<LoadStats> {
        let tx = self.connection_mut().transaction()?;
        upsert_regions(&tx, regions)?;
        upsert_time(&tx, time)?;
        upsert_sectors(&tx, dims)?;
        upsert_gases(&tx, dims)?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO fact_emissions (region_id, year, sector_id, gas_id, emissions_kt)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(region_id, year, sector_id, gas_id) DO UPDATE SET
                     emissions_kt = excluded.emissions_kt",
            )?;
            for fact in facts {
                stmt.execute(params![
                    fact.region_id,
                    fact.year,
                    fact.sector_id,
                    fact.gas_id,
                    fact.value_kt,
                ])?;
            }
        }
        tx.commit()?;
        info!(facts = facts.len(), "emissions batch committed");
        Ok(LoadStats {
            facts: facts.len() as u64,
        })
    }

    /// Load one cause-of-death batch at grain (region, year, cause).
    pub fn load_causes_batch(
        &mut self,
        regions: &RegionCatalog,
        time: &[TimePeriod],
        dims: &Icd10Dimensions,
        facts: &[CauseOfDeathFact],
    ) -> Result<LoadStats> {
        let tx = self.connection_mut().transaction()?;
        upsert_regions(&tx, regions)?;
        upsert_time(&tx, time)?;
        upsert_icd10(&tx, "dim_cause", "cause", dims)?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO fact_causes_of_death (region_id, year, cause_id, rate_per_100k)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(region_id, year, cause_id) DO UPDATE SET
                     rate_per_100k = excluded.rate_per_100k",
            )?;
            for fact in facts {
                stmt.execute(params![fact.region_id, fact.year, fact.cause_id, fact.rate_per_100k])?;
            }
        }
        tx.commit()?;
        info!(facts = facts.len(), "causes-of-death batch committed");
        Ok(LoadStats {
            facts: facts.len() as u64,
        })
    }

    /// Load one hospital-discharge batch at grain (region, year, group).
    pub fn load_discharges_batch(
        &mut self,
        regions: &RegionCatalog,
        time: &[TimePeriod],
        dims: &Icd10Dimensions,
        facts: &[DischargeFact],
    ) -> Result<LoadStats> {
        let tx = self.connection_mut().transaction()?;
        upsert_regions(&tx, regions)?;
        upsert_time(&tx, time)?;
        upsert_icd10(&tx, "dim_discharge", "discharge", dims)?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO fact_hospital_discharges
                     (region_id, year, discharge_id, discharge_count, discharge_rate_per_100k)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(region_id, year, discharge_id) DO UPDATE SET
                     discharge_count = excluded.discharge_count,
                     discharge_rate_per_100k = excluded.discharge_rate_per_100k",
            )?;
            for fact in facts {
                stmt.execute(params![
                    fact.region_id,
                    fact.year,
                    fact.discharge_id,
                    fact.count,
                    fact.rate_per_100k,
                ])?;
            }
        }
        tx.commit()?;
        info!(facts = facts.len(), "hospital-discharge batch committed");
        Ok(LoadStats {
            facts: facts.len() as u64,
        })
    }

    /// Load one population batch at grain (region, year).
    pub fn load_population_batch(
        &mut self,
        regions: &RegionCatalog,
        time: &[TimePeriod],
        facts: &[PopulationFact],
    ) -> Result<LoadStats> {
        let tx = self.connection_mut().transaction()?;
        upsert_regions(&tx, regions)?;
        upsert_time(&tx, time)?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO fact_population (region_id, year, population)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(region_id, year) DO UPDATE SET
                     population = excluded.population",
            )?;
            for fact in facts {
                stmt.execute(params![fact.region_id, fact.year, fact.population])?;
            }
        }
        tx.commit()?;
        info!(facts = facts.len(), "population batch committed");
        Ok(LoadStats {
            facts: facts.len() as u64,
        })
    }

    /// Make sure the time dimension holds a row for every period given
    /// (typically the contiguous union span across all families).
    pub fn ensure_time_span(&mut self, periods: &[TimePeriod]) -> Result<()> {
        let tx = self.connection_mut().transaction()?;
        upsert_time(&tx, periods)?;
        tx.commit()?;
        Ok(())
    }

    /// Distinct years currently present per fact family, read from the
    /// store so single-family re-loads see earlier runs' spans.
    pub fn family_years(&self) -> Result<ech_harmonize::FamilyYears> {
        let mut years = ech_harmonize::FamilyYears::default();
        for (table, set) in [
            ("fact_emissions", &mut years.emissions),
            ("fact_causes_of_death", &mut years.health),
            ("fact_population", &mut years.population),
        ] {
            let mut stmt = self
                .connection()
                .prepare(&format!("SELECT DISTINCT year FROM {table}"))?;
            let rows = stmt.query_map([], |row| row.get::<_, i32>(0))?;
            for year in rows {
                set.insert(year?);
            }
        }
        let mut stmt = self
            .connection()
            .prepare("SELECT DISTINCT year FROM fact_hospital_discharges")?;
        let rows = stmt.query_map([], |row| row.get::<_, i32>(0))?;
        for year in rows {
            years.health.insert(year?);
        }
        Ok(years)
    }

    /// Recompute every availability flag from current fact contents.
    ///
    /// Running this twice with no fact change yields no change. The health
    /// flag covers both health streams.
    pub fn refresh_coverage(&mut self) -> Result<()> {
        self.connection().execute_batch(
            "UPDATE dim_time SET
                 is_emissions_available =
                     EXISTS (SELECT 1 FROM fact_emissions f WHERE f.year = dim_time.year),
                 is_health_available =
                     EXISTS (SELECT 1 FROM fact_causes_of_death f WHERE f.year = dim_time.year)
                     OR EXISTS (SELECT 1 FROM fact_hospital_discharges f WHERE f.year = dim_time.year),
                 is_population_available =
                     EXISTS (SELECT 1 FROM fact_population f WHERE f.year = dim_time.year);",
        )?;
        Ok(())
    }

    /// Current population facts, for the discharge-rate join.
    pub fn population_facts(&self) -> Result<Vec<PopulationFact>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT region_id, year, population FROM fact_population")?;
        let facts = stmt
            .query_map([], |row| {
                Ok(PopulationFact {
                    region_id: row.get(0)?,
                    year: row.get(1)?,
                    population: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(facts)
    }

    /// Re-derive every stored discharge rate against current population
    /// facts. Invoked after a population batch commits so rates loaded
    /// before the population stream pick up their denominator.
    pub fn refresh_discharge_rates(&mut self) -> Result<u64> {
        let population = self.population_facts()?;
        let mut discharges = {
            let mut stmt = self.connection().prepare(
                "SELECT region_id, year, discharge_id, discharge_count FROM fact_hospital_discharges",
            )?;
            let facts = stmt
                .query_map([], |row| {
                    Ok(DischargeFact {
                        region_id: row.get(0)?,
                        year: row.get(1)?,
                        discharge_id: row.get(2)?,
                        count: row.get(3)?,
                        rate_per_100k: None,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            facts
        };
        apply_discharge_rates(&mut discharges, &population);
        let tx = self.connection_mut().transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "UPDATE fact_hospital_discharges SET discharge_rate_per_100k = ?4
                 WHERE region_id = ?1 AND year = ?2 AND discharge_id = ?3",
            )?;
            for fact in &discharges {
                stmt.execute(params![
                    fact.region_id,
                    fact.year,
                    fact.discharge_id,
                    fact.rate_per_100k,
                ])?;
            }
        }
        tx.commit()?;
        Ok(discharges.len() as u64)
    }
}
