//! End-to-end loader behavior: upsert semantics, idempotence, coverage
//! flags, derived rates, and integrity verification.

use ech_harmonize::{
    FamilyYears, OverwritePolicy, RegionCatalog, assemble_discharges, assemble_emissions,
    assemble_population, compute_coverage, reconcile_discharges, reconcile_emissions,
    reconcile_population,
};
use ech_model::{
    DischargeRecord, EmissionRecord, PopulationRecord, TimePeriod,
};
use ech_vocab::Vocabulary;
use ech_warehouse::{IntegrityOptions, SectorTotals, Warehouse};

fn emission(region: &str, year: i32, sector: &str, gas: &str, value: f64) -> EmissionRecord {
    EmissionRecord {
        region_code: region.to_string(),
        region_label: Some("Burgenland".to_string()),
        country_iso: Some("AT".to_string()),
        country_name: Some("Austria".to_string()),
        year,
        sector: sector.to_string(),
        gas: gas.to_string(),
        value_kt: value,
    }
}

fn years(list: &[i32]) -> Vec<TimePeriod> {
    list.iter().copied().map(TimePeriod::new).collect()
}

/// Reconcile, assemble, and load one emissions batch.
fn load_emissions(warehouse: &mut Warehouse, records: &[EmissionRecord]) {
    let vocab = Vocabulary::builtin();
    let mut regions = RegionCatalog::new();
    let dims = reconcile_emissions(records, &vocab, &mut regions).expect("reconcile");
    let assembled =
        assemble_emissions(records, &vocab, OverwritePolicy::Abort).expect("assemble");
    let mut span: Vec<i32> = records.iter().map(|r| r.year).collect();
    span.sort_unstable();
    span.dedup();
    warehouse
        .load_emissions_batch(&regions, &years(&span), &dims, &assembled.facts)
        .expect("load");
}

#[test]
fn second_load_overwrites_without_duplicating() {
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    load_emissions(
        &mut warehouse,
        &[emission("AT11", 2020, "Energy", "CO2", 120.5)],
    );
    load_emissions(
        &mut warehouse,
        &[emission("AT11", 2020, "Energy", "CO2", 130.0)],
    );

    assert_eq!(warehouse.count("fact_emissions").unwrap(), 1);
    let value: f64 = warehouse
        .connection()
        .query_row("SELECT emissions_kt FROM fact_emissions", [], |row| row.get(0))
        .unwrap();
    assert_eq!(value, 130.0);
}

#[test]
fn reloading_identical_input_is_idempotent() {
    let records = vec![
        emission("AT11", 2020, "Energy", "CO2", 120.5),
        emission("AT11", 2020, "Transport", "CO2", 30.0),
        emission("AT12", 2021, "Energy", "ch4", 8.25),
    ];
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    load_emissions(&mut warehouse, &records);
    let count_first = warehouse.count("fact_emissions").unwrap();
    let sum_first: f64 = warehouse
        .connection()
        .query_row("SELECT SUM(emissions_kt) FROM fact_emissions", [], |row| row.get(0))
        .unwrap();

    load_emissions(&mut warehouse, &records);
    let count_second = warehouse.count("fact_emissions").unwrap();
    let sum_second: f64 = warehouse
        .connection()
        .query_row("SELECT SUM(emissions_kt) FROM fact_emissions", [], |row| row.get(0))
        .unwrap();

    assert_eq!(count_first, count_second);
    assert_eq!(sum_first, sum_second);
    assert_eq!(warehouse.count("dim_region").unwrap(), 2);
    assert_eq!(warehouse.count("dim_sector").unwrap(), 2);
}

#[test]
fn adapter_record_round_trips_through_joined_view() {
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    load_emissions(
        &mut warehouse,
        &[emission("AT11", 2020, "Dom_Avi", "fossil_co2", 42.125)],
    );

    let (region, label, year, sector, group, gas, value): (
        String,
        String,
        i32,
        String,
        String,
        String,
        f64,
    ) = warehouse
        .connection()
        .query_row(
            "SELECT region_code, region_label, year, sector_code, sector_group, gas_code, emissions_kt
             FROM v_emissions",
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            },
        )
        .unwrap();
    assert_eq!(region, "AT11");
    assert_eq!(label, "Burgenland");
    assert_eq!(year, 2020);
    assert_eq!(sector, "Dom_Avi");
    assert_eq!(group, "transport");
    // Raw label normalized to the canonical gas code.
    assert_eq!(gas, "CO2");
    assert_eq!(value, 42.125);
}

#[test]
fn region_levels_hold_for_every_row_after_load() {
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    load_emissions(
        &mut warehouse,
        &[
            emission("AT", 2020, "Energy", "CO2", 1.0),
            emission("AT1", 2020, "Energy", "CO2", 1.0),
            emission("AT11", 2020, "Energy", "CO2", 1.0),
            emission("AT111", 2020, "Energy", "CO2", 1.0),
        ],
    );
    let mut stmt = warehouse
        .connection()
        .prepare("SELECT region_code, region_level FROM dim_region ORDER BY region_code")
        .unwrap();
    let rows: Vec<(String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        rows,
        vec![
            ("AT".to_string(), 0),
            ("AT1".to_string(), 1),
            ("AT11".to_string(), 2),
            ("AT111".to_string(), 3),
        ]
    );
    // And the integrity check agrees.
    let issues = warehouse
        .verify(None, &IntegrityOptions::default())
        .unwrap();
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");
}

#[test]
fn region_enrichment_fills_gaps_only() {
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    // Health source first: bare code, no label.
    let discharge_records = vec![DischargeRecord {
        region_code: "AT11".to_string(),
        year: 2019,
        discharge_group: "J45_J46".to_string(),
        count: 500.0,
    }];
    let vocab = Vocabulary::builtin();
    let mut regions = RegionCatalog::new();
    let dims = reconcile_discharges(&discharge_records, &vocab, &mut regions).unwrap();
    let assembled =
        assemble_discharges(&discharge_records, &vocab, OverwritePolicy::Abort).unwrap();
    warehouse
        .load_discharges_batch(&regions, &years(&[2019]), &dims, &assembled.facts)
        .unwrap();
    let label: Option<String> = warehouse
        .connection()
        .query_row("SELECT region_label FROM dim_region", [], |row| row.get(0))
        .unwrap();
    assert_eq!(label, None);

    // Richer emissions source later fills the gaps without overwriting.
    load_emissions(
        &mut warehouse,
        &[emission("AT11", 2020, "Energy", "CO2", 1.0)],
    );
    let (label, country): (Option<String>, Option<String>) = warehouse
        .connection()
        .query_row(
            "SELECT region_label, country_name FROM dim_region",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(label.as_deref(), Some("Burgenland"));
    assert_eq!(country.as_deref(), Some("Austria"));
    assert_eq!(warehouse.count("dim_region").unwrap(), 1);
}

#[test]
fn discharge_rates_derive_after_population_commits() {
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    let vocab = Vocabulary::builtin();

    // Discharges load first; population is not in yet, so rates stay null.
    let discharge_records = vec![
        DischargeRecord {
            region_code: "AT11".to_string(),
            year: 2019,
            discharge_group: "J45_J46".to_string(),
            count: 500.0,
        },
        DischargeRecord {
            region_code: "AT12".to_string(),
            year: 2019,
            discharge_group: "J45_J46".to_string(),
            count: 123.0,
        },
    ];
    let mut regions = RegionCatalog::new();
    let dims = reconcile_discharges(&discharge_records, &vocab, &mut regions).unwrap();
    let assembled =
        assemble_discharges(&discharge_records, &vocab, OverwritePolicy::Abort).unwrap();
    warehouse
        .load_discharges_batch(&regions, &years(&[2019]), &dims, &assembled.facts)
        .unwrap();

    // Population for AT11 only.
    let population_records = vec![PopulationRecord {
        region_code: "AT11".to_string(),
        year: 2019,
        population: 100000.0,
    }];
    let mut regions = RegionCatalog::new();
    reconcile_population(&population_records, &mut regions);
    let assembled_population =
        assemble_population(&population_records, OverwritePolicy::Abort).unwrap();
    warehouse
        .load_population_batch(&regions, &years(&[2019]), &assembled_population.facts)
        .unwrap();
    warehouse.refresh_discharge_rates().unwrap();

    let rows: Vec<(String, f64, Option<f64>)> = warehouse
        .connection()
        .prepare(
            "SELECT region_code, discharge_count, discharge_rate_per_100k
             FROM v_hospital_discharges ORDER BY region_code",
        )
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(rows.len(), 2);
    let (_, count, rate) = &rows[0];
    assert_eq!(*count, 500.0);
    assert!((rate.unwrap() - 500.0).abs() < 1e-9);
    // No population for AT12: rate null, count preserved.
    let (_, count, rate) = &rows[1];
    assert_eq!(*count, 123.0);
    assert_eq!(*rate, None);
}

#[test]
fn coverage_flags_track_fact_existence_per_family() {
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    load_emissions(
        &mut warehouse,
        &[emission("AT11", 2020, "Energy", "CO2", 1.0)],
    );

    let population_records = vec![PopulationRecord {
        region_code: "AT11".to_string(),
        year: 2019,
        population: 100000.0,
    }];
    let mut regions = RegionCatalog::new();
    reconcile_population(&population_records, &mut regions);
    let assembled = assemble_population(&population_records, OverwritePolicy::Abort).unwrap();

    // The time dimension spans the union of both streams.
    let family_years = FamilyYears {
        emissions: [2020].into(),
        health: Default::default(),
        population: [2019].into(),
    };
    let span = compute_coverage(&family_years);
    warehouse
        .load_population_batch(&regions, &span, &assembled.facts)
        .unwrap();
    warehouse.refresh_coverage().unwrap();

    let rows: Vec<(i32, bool, bool, bool)> = warehouse
        .connection()
        .prepare(
            "SELECT year, is_emissions_available, is_health_available, is_population_available
             FROM dim_time ORDER BY year",
        )
        .unwrap()
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(rows, vec![(2019, false, false, true), (2020, true, false, false)]);

    // Recomputing with no fact change yields no change.
    warehouse.refresh_coverage().unwrap();
    let again: Vec<(i32, bool, bool, bool)> = warehouse
        .connection()
        .prepare(
            "SELECT year, is_emissions_available, is_health_available, is_population_available
             FROM dim_time ORDER BY year",
        )
        .unwrap()
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows, again);
}

#[test]
fn sector_totals_check_flags_divergence_beyond_tolerance() {
    let records = vec![
        emission("AT11", 2020, "Energy", "CO2", 100.0),
        emission("AT11", 2020, "Transport", "CO2", 50.0),
    ];
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    let vocab = Vocabulary::builtin();
    let mut regions = RegionCatalog::new();
    let dims = reconcile_emissions(&records, &vocab, &mut regions).unwrap();
    let assembled = assemble_emissions(&records, &vocab, OverwritePolicy::Abort).unwrap();
    warehouse
        .load_emissions_batch(&regions, &years(&[2020]), &dims, &assembled.facts)
        .unwrap();

    let expected = SectorTotals::from_facts(&assembled.facts);
    let issues = warehouse
        .verify(Some(&expected), &IntegrityOptions::default())
        .unwrap();
    assert!(issues.is_empty(), "unexpected issues: {issues:?}");

    // Tamper with a stored value: the reconciliation must notice.
    warehouse
        .connection()
        .execute("UPDATE fact_emissions SET emissions_kt = emissions_kt + 1.0", [])
        .unwrap();
    let issues = warehouse
        .verify(Some(&expected), &IntegrityOptions::default())
        .unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].check, "sector_totals");

    // A generous tolerance accepts the same divergence.
    let issues = warehouse
        .verify(Some(&expected), &IntegrityOptions { tolerance_kt: 10.0 })
        .unwrap();
    assert!(issues.is_empty());
}

#[test]
fn orphaned_foreign_keys_are_a_hard_violation() {
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    load_emissions(
        &mut warehouse,
        &[emission("AT11", 2020, "Energy", "CO2", 1.0)],
    );
    // Sneak an orphan past the constraint, as schema drift would.
    warehouse
        .connection()
        .execute_batch(
            "PRAGMA foreign_keys = OFF;
             INSERT INTO fact_emissions (region_id, year, sector_id, gas_id, emissions_kt)
             VALUES (999, 2020, 999, 999, 1.0);",
        )
        .unwrap();
    let err = warehouse
        .verify(None, &IntegrityOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ech_warehouse::WarehouseError::ForeignKey { .. }
    ));
}

#[test]
fn unmapped_gas_aborts_before_anything_is_written() {
    let warehouse = Warehouse::open_in_memory().unwrap();
    let records = vec![emission("AT11", 2020, "Energy", "UNKNOWNGAS", 1.0)];
    let vocab = Vocabulary::builtin();
    let mut regions = RegionCatalog::new();
    assert!(reconcile_emissions(&records, &vocab, &mut regions).is_err());
    // Nothing reached the store for this batch.
    assert_eq!(warehouse.count("fact_emissions").unwrap(), 0);
    assert_eq!(warehouse.count("dim_gas").unwrap(), 0);
}
