//! Post-load integrity verification.
//!
//! Non-fatal findings (negative measurements, sector totals drifting from
//! the batch's computed aggregates) become warnings in the run report. A
//! fact row whose foreign keys do not resolve is a hard violation and
//! surfaces as an error.

use std::collections::BTreeMap;

use rusqlite::params;

use ech_model::{EmissionsFact, IssueSeverity, QualityIssue, SAMPLE_LIMIT};

use crate::error::{Result, WarehouseError};
use crate::store::Warehouse;

/// Tunable verification thresholds.
#[derive(Debug, Clone, Copy)]
pub struct IntegrityOptions {
    /// Allowed absolute divergence, in kilotonnes, between the stored
    /// per-(region, year) emissions sum and the aggregate computed from the
    /// assembled batch.
    pub tolerance_kt: f64,
}

impl Default for IntegrityOptions {
    fn default() -> Self {
        Self { tolerance_kt: 1e-6 }
    }
}

/// Per-(region, year) emissions aggregates computed at assembly time,
/// before loading. Verification compares the warehouse against these.
#[derive(Debug, Clone, Default)]
pub struct SectorTotals(pub BTreeMap<(i64, i32), f64>);

impl SectorTotals {
    pub fn from_facts(facts: &[EmissionsFact]) -> Self {
        let mut totals: BTreeMap<(i64, i32), f64> = BTreeMap::new();
        for fact in facts {
            *totals.entry((fact.region_id, fact.year)).or_insert(0.0) += fact.value_kt;
        }
        Self(totals)
    }
}

const FACT_GRAINS: [(&str, &str); 4] = [
    ("fact_emissions", "region_id, year, sector_id, gas_id"),
    ("fact_causes_of_death", "region_id, year, cause_id"),
    ("fact_hospital_discharges", "region_id, year, discharge_id"),
    ("fact_population", "region_id, year"),
];

const FOREIGN_KEYS: [(&str, &str, &str, &str); 12] = [
    ("fact_emissions", "region_id", "dim_region", "region"),
    ("fact_emissions", "sector_id", "dim_sector", "sector"),
    ("fact_emissions", "gas_id", "dim_gas", "gas"),
    ("fact_emissions", "year", "dim_time", "time"),
    ("fact_causes_of_death", "region_id", "dim_region", "region"),
    ("fact_causes_of_death", "cause_id", "dim_cause", "cause"),
    ("fact_causes_of_death", "year", "dim_time", "time"),
    ("fact_hospital_discharges", "region_id", "dim_region", "region"),
    ("fact_hospital_discharges", "discharge_id", "dim_discharge", "discharge"),
    ("fact_hospital_discharges", "year", "dim_time", "time"),
    ("fact_population", "region_id", "dim_region", "region"),
    ("fact_population", "year", "dim_time", "time"),
];

impl Warehouse {
    /// Run every post-load check. Returns the warning-level findings;
    /// a hard foreign-key violation is returned as an error instead.
    pub fn verify(
        &self,
        expected_totals: Option<&SectorTotals>,
        options: &IntegrityOptions,
    ) -> Result<Vec<QualityIssue>> {
        let mut issues = Vec::new();
        self.check_foreign_keys()?;
        self.check_grain_uniqueness(&mut issues)?;
        self.check_negative_values(&mut issues)?;
        if let Some(expected) = expected_totals {
            self.check_sector_totals(expected, options, &mut issues)?;
        }
        self.check_region_levels(&mut issues)?;
        Ok(issues)
    }

    /// Hard constraint: every fact foreign key resolves to a dimension row.
    fn check_foreign_keys(&self) -> Result<()> {
        for (fact_table, key, dim_table, dimension) in FOREIGN_KEYS {
            let sql = format!(
                "SELECT COUNT(*) FROM {fact_table} f
                 LEFT JOIN {dim_table} d ON d.{key} = f.{key}
                 WHERE d.{key} IS NULL"
            );
            let count: u64 = self
                .connection()
                .query_row(&sql, [], |row| row.get(0))?;
            if count > 0 {
                return Err(WarehouseError::ForeignKey {
                    fact_table,
                    dimension,
                    count,
                });
            }
        }
        Ok(())
    }

    /// The composite primary keys make duplicates impossible; verifying
    /// anyway guards against schema drift.
    fn check_grain_uniqueness(&self, issues: &mut Vec<QualityIssue>) -> Result<()> {
        for (table, grain) in FACT_GRAINS {
            let sql = format!(
                "SELECT COUNT(*) FROM (SELECT 1 FROM {table} GROUP BY {grain} HAVING COUNT(*) > 1)"
            );
            let duplicates: u64 = self
                .connection()
                .query_row(&sql, [], |row| row.get(0))?;
            if duplicates > 0 {
                issues.push(QualityIssue {
                    check: "grain_uniqueness".to_string(),
                    message: format!("{table}: {duplicates} grain keys occur more than once"),
                    severity: IssueSeverity::Error,
                    count: Some(duplicates),
                    sample: Vec::new(),
                });
            }
        }
        Ok(())
    }

    /// Population and discharge counts cannot be negative.
    fn check_negative_values(&self, issues: &mut Vec<QualityIssue>) -> Result<()> {
        for (table, column) in [
            ("fact_population", "population"),
            ("fact_hospital_discharges", "discharge_count"),
        ] {
            let sql = format!("SELECT COUNT(*) FROM {table} WHERE {column} < 0");
            let count: u64 = self
                .connection()
                .query_row(&sql, [], |row| row.get(0))?;
            if count > 0 {
                issues.push(QualityIssue {
                    check: "negative_values".to_string(),
                    message: format!("{table}: {count} rows with negative {column}"),
                    severity: IssueSeverity::Warning,
                    count: Some(count),
                    sample: Vec::new(),
                });
            }
        }
        Ok(())
    }

    /// Stored per-(region, year) emissions sums must match the aggregates
    /// computed from the assembled batch within the configured tolerance.
    fn check_sector_totals(
        &self,
        expected: &SectorTotals,
        options: &IntegrityOptions,
        issues: &mut Vec<QualityIssue>,
    ) -> Result<()> {
        let mut stmt = self.connection().prepare(
            "SELECT COALESCE(SUM(emissions_kt), 0.0) FROM fact_emissions
             WHERE region_id = ?1 AND year = ?2",
        )?;
        let mut divergent = 0u64;
        let mut sample = Vec::new();
        for ((region_id, year), expected_total) in &expected.0 {
            let stored: f64 = stmt.query_row(params![region_id, year], |row| row.get(0))?;
            if (stored - expected_total).abs() > options.tolerance_kt {
                divergent += 1;
                if sample.len() < SAMPLE_LIMIT {
                    sample.push(format!(
                        "region {region_id} year {year}: stored {stored}, expected {expected_total}"
                    ));
                }
            }
        }
        if divergent > 0 {
            issues.push(QualityIssue {
                check: "sector_totals".to_string(),
                message: format!(
                    "emissions sums diverge from batch aggregates for {divergent} region-years \
                     (tolerance {} kt)",
                    options.tolerance_kt
                ),
                severity: IssueSeverity::Warning,
                count: Some(divergent),
                sample,
            });
        }
        Ok(())
    }

    /// The stored level must equal the level derived from the code length
    /// for every region row.
    fn check_region_levels(&self, issues: &mut Vec<QualityIssue>) -> Result<()> {
        let mut stmt = self
            .connection()
            .prepare("SELECT region_code, region_level FROM dim_region")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut bad = 0u64;
        let mut sample = Vec::new();
        for (code, stored_level) in rows {
            let derived = ech_model::RegionLevel::from_code(&code).map(|level| level.as_i64());
            if derived != Some(stored_level) {
                bad += 1;
                if sample.len() < SAMPLE_LIMIT {
                    sample.push(format!("{code}: stored level {stored_level}"));
                }
            }
        }
        if bad > 0 {
            issues.push(QualityIssue {
                check: "region_levels".to_string(),
                message: format!("{bad} region rows store a level inconsistent with their code"),
                severity: IssueSeverity::Error,
                count: Some(bad),
                sample,
            });
        }
        Ok(())
    }
}
