//! End-to-end pipeline tests over staged fixture files.

use std::fs;
use std::path::Path;

use ech_cli::manifest::RunManifest;
use ech_cli::pipeline::{PipelineOptions, run_pipeline};
use ech_model::BatchStatus;
use ech_warehouse::Warehouse;

const EMISSIONS_CSV: &str = "\
Substance,ISO,Country,NUTS 2,NUTS 2 desc,Sector,Y_2019,Y_2020
CO2,AT,Austria,AT11,Burgenland,Energy,100.0,120.5
CO2,AT,Austria,AT11,Burgenland,Transport,20.0,25.0
CO2,AT,Austria,AT12,Niederoesterreich,Energy,:,80.0
";

const CAUSES_TSV: &str = "\
freq,unit,sex,age,icd10,geo\\TIME_PERIOD\t2019\t2020
A,RT,T,TOTAL,J12-J18,AT11\t31.7\t29.4
A,RT,T,TOTAL,J45_J46,AT11\t2.1\t:
A,RT,M,TOTAL,J12-J18,AT11\t40.0\t41.0
";

const DISCHARGES_TSV: &str = "\
freq,unit,sex,age,icd10,geo\\TIME_PERIOD\t2019
A,NR,T,TOTAL,J45_J46,AT11\t500
A,NR,T,TOTAL,J45_J46,AT12\t200
";

const POPULATION_TSV: &str = "\
freq,unit,sex,age,geo\\TIME_PERIOD\t2019\t2020
A,NR,T,TOTAL,AT11\t100000\t101000
A,NR,T,TOTAL,AT12\t:\t251000
";

fn stage(dir: &Path, manifest_extra: &str) -> RunManifest {
    fs::write(dir.join("emissions_co2.csv"), EMISSIONS_CSV).unwrap();
    fs::write(dir.join("causes.tsv"), CAUSES_TSV).unwrap();
    fs::write(dir.join("discharges.tsv"), DISCHARGES_TSV).unwrap();
    fs::write(dir.join("population.tsv"), POPULATION_TSV).unwrap();
    let manifest_toml = format!(
        r#"
db_path = "warehouse.db"

[inputs]
causes_of_death = "causes.tsv"
hospital_discharges = "discharges.tsv"
population = "population.tsv"

[[inputs.emissions]]
path = "emissions_co2.csv"
gas = "fossil_co2"

{manifest_extra}
"#
    );
    let manifest_path = dir.join("run.toml");
    fs::write(&manifest_path, manifest_toml).unwrap();
    RunManifest::load(&manifest_path).unwrap()
}

#[test]
fn full_run_loads_every_family() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = stage(dir.path(), "");
    let options = PipelineOptions::from_manifest(&manifest);
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    let report = run_pipeline(&manifest, &mut warehouse, &options).unwrap();

    assert!(!report.has_errors(), "unexpected errors: {report:?}");
    assert_eq!(report.families.len(), 4);
    for family in &report.families {
        assert_eq!(family.status, BatchStatus::Loaded, "{family:?}");
    }

    // 5 emission values (one sentinel dropped), 3 cause rates, 2 discharge
    // counts, 3 population counts.
    assert_eq!(warehouse.count("fact_emissions").unwrap(), 5);
    assert_eq!(warehouse.count("fact_causes_of_death").unwrap(), 3);
    assert_eq!(warehouse.count("fact_hospital_discharges").unwrap(), 2);
    assert_eq!(warehouse.count("fact_population").unwrap(), 3);

    // Derived rate: 500 discharges against 100000 inhabitants.
    let rate: f64 = warehouse
        .connection()
        .query_row(
            "SELECT discharge_rate_per_100k FROM v_hospital_discharges
             WHERE region_code = 'AT11' AND year = 2019",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!((rate - 500.0).abs() < 1e-9);

    // AT12 has no 2019 population: rate null, count preserved.
    let (count, rate): (f64, Option<f64>) = warehouse
        .connection()
        .query_row(
            "SELECT discharge_count, discharge_rate_per_100k FROM v_hospital_discharges
             WHERE region_code = 'AT12' AND year = 2019",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(count, 200.0);
    assert_eq!(rate, None);

    // Coverage flags reflect per-family fact existence.
    let flags: Vec<(i32, bool, bool, bool)> = warehouse
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
    assert_eq!(flags, vec![(2019, true, true, true), (2020, true, true, true)]);
}

#[test]
fn rerunning_the_pipeline_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = stage(dir.path(), "");
    let options = PipelineOptions::from_manifest(&manifest);
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    run_pipeline(&manifest, &mut warehouse, &options).unwrap();

    let counts = |warehouse: &Warehouse| -> (u64, u64, u64, u64) {
        (
            warehouse.count("fact_emissions").unwrap(),
            warehouse.count("fact_causes_of_death").unwrap(),
            warehouse.count("fact_hospital_discharges").unwrap(),
            warehouse.count("fact_population").unwrap(),
        )
    };
    let sums = |warehouse: &Warehouse| -> (f64, f64) {
        (
            warehouse
                .connection()
                .query_row("SELECT SUM(emissions_kt) FROM fact_emissions", [], |row| {
                    row.get(0)
                })
                .unwrap(),
            warehouse
                .connection()
                .query_row("SELECT SUM(population) FROM fact_population", [], |row| {
                    row.get(0)
                })
                .unwrap(),
        )
    };
    let first_counts = counts(&warehouse);
    let first_sums = sums(&warehouse);

    let report = run_pipeline(&manifest, &mut warehouse, &options).unwrap();
    assert!(!report.has_errors());
    assert_eq!(counts(&warehouse), first_counts);
    assert_eq!(sums(&warehouse), first_sums);
}

#[test]
fn unmapped_gas_aborts_only_the_emissions_batch() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = stage(dir.path(), "");
    // Replace the emissions fixture with an unknown gas label.
    fs::write(
        dir.path().join("emissions_co2.csv"),
        "\
Substance,ISO,Country,NUTS 2,NUTS 2 desc,Sector,Y_2020
UNKNOWNGAS,AT,Austria,AT11,Burgenland,Energy,1.0
",
    )
    .unwrap();
    let options = PipelineOptions::from_manifest(&manifest);
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    let report = run_pipeline(&manifest, &mut warehouse, &options).unwrap();

    assert!(report.has_errors());
    let emissions = report
        .families
        .iter()
        .find(|family| family.family == ech_model::FactFamily::Emissions)
        .unwrap();
    assert_eq!(emissions.status, BatchStatus::Aborted);
    assert!(emissions.error.as_deref().unwrap().contains("UNKNOWNGAS"));
    // The warehouse is unchanged for the aborted batch; other families load.
    assert_eq!(warehouse.count("fact_emissions").unwrap(), 0);
    assert_eq!(warehouse.count("fact_causes_of_death").unwrap(), 3);
    assert_eq!(warehouse.count("fact_population").unwrap(), 3);
}

#[test]
fn duplicate_grain_aborts_unless_last_wins_requested() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = stage(dir.path(), "");
    // Same grain twice with different values.
    fs::write(
        dir.path().join("emissions_co2.csv"),
        "\
Substance,ISO,Country,NUTS 2,NUTS 2 desc,Sector,Y_2020
CO2,AT,Austria,AT11,Burgenland,Energy,120.5
CO2,AT,Austria,AT11,Burgenland,Energy,130.0
",
    )
    .unwrap();
    let options = PipelineOptions::from_manifest(&manifest);
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    let report = run_pipeline(&manifest, &mut warehouse, &options).unwrap();
    let emissions = &report.families[0];
    assert_eq!(emissions.status, BatchStatus::Aborted);
    assert_eq!(warehouse.count("fact_emissions").unwrap(), 0);

    // Same inputs under last-wins: one row, final value, warning reported.
    let manifest = stage(dir.path(), "[options]\noverwrite_last_wins = true\n");
    fs::write(
        dir.path().join("emissions_co2.csv"),
        "\
Substance,ISO,Country,NUTS 2,NUTS 2 desc,Sector,Y_2020
CO2,AT,Austria,AT11,Burgenland,Energy,120.5
CO2,AT,Austria,AT11,Burgenland,Energy,130.0
",
    )
    .unwrap();
    let options = PipelineOptions::from_manifest(&manifest);
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    let report = run_pipeline(&manifest, &mut warehouse, &options).unwrap();
    assert_eq!(report.families[0].status, BatchStatus::Loaded);
    assert!(report.issues.iter().any(|issue| issue.check == "grain_uniqueness"));
    let value: f64 = warehouse
        .connection()
        .query_row("SELECT emissions_kt FROM fact_emissions", [], |row| row.get(0))
        .unwrap();
    assert_eq!(value, 130.0);
}

#[test]
fn expired_timeout_skips_remaining_batches() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = stage(dir.path(), "[options]\ntimeout_secs = 0\n");
    let options = PipelineOptions::from_manifest(&manifest);
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    let report = run_pipeline(&manifest, &mut warehouse, &options).unwrap();
    for family in &report.families {
        assert_eq!(family.status, BatchStatus::Skipped, "{family:?}");
        assert_eq!(
            family.error.as_deref(),
            Some("run timeout exceeded"),
            "{family:?}"
        );
    }
    assert_eq!(warehouse.count("fact_emissions").unwrap(), 0);
}

#[test]
fn level2_filter_restricts_regions() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = stage(dir.path(), "[options]\nlevel2_only = true\n");
    // Mix country-level and level-2 rows.
    fs::write(
        dir.path().join("emissions_co2.csv"),
        "\
Substance,ISO,Country,NUTS 2,NUTS 2 desc,Sector,Y_2020
CO2,AT,Austria,AT,Austria,Energy,500.0
CO2,AT,Austria,AT11,Burgenland,Energy,120.5
",
    )
    .unwrap();
    let options = PipelineOptions::from_manifest(&manifest);
    let mut warehouse = Warehouse::open_in_memory().unwrap();
    let report = run_pipeline(&manifest, &mut warehouse, &options).unwrap();
    assert!(!report.has_errors(), "unexpected errors: {report:?}");
    let codes: Vec<String> = warehouse
        .connection()
        .prepare("SELECT DISTINCT region_code FROM v_emissions ORDER BY region_code")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(codes, vec!["AT11".to_string()]);
}
