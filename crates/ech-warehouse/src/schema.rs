//! Star schema DDL.
//!
//! Table and view names, grains, and foreign-key relationships are the
//! stable contract external readers (dashboards, BI tools) depend on;
//! changing them is a breaking change.

/// Dimension and fact tables. Facts carry composite primary keys on their
/// grain, so uniqueness is enforced by the store itself, and foreign keys
/// to every dimension they reference.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS dim_region (
    region_id     INTEGER PRIMARY KEY,
    region_code   TEXT NOT NULL UNIQUE,
    region_label  TEXT,
    region_level  INTEGER NOT NULL,
    country_iso   TEXT,
    country_name  TEXT
);

CREATE TABLE IF NOT EXISTS dim_time (
    year                     INTEGER PRIMARY KEY,
    decade                   INTEGER NOT NULL,
    year_label               TEXT NOT NULL,
    is_leap_year             INTEGER NOT NULL,
    is_emissions_available   INTEGER NOT NULL DEFAULT 0,
    is_health_available      INTEGER NOT NULL DEFAULT 0,
    is_population_available  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS dim_sector (
    sector_id     INTEGER PRIMARY KEY,
    sector_code   TEXT NOT NULL UNIQUE,
    sector_name   TEXT NOT NULL,
    sector_group  TEXT NOT NULL,
    is_active     INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS dim_gas (
    gas_id       INTEGER PRIMARY KEY,
    gas_code     TEXT NOT NULL UNIQUE,
    gas_name     TEXT NOT NULL,
    gas_formula  TEXT,
    gwp_ar5      REAL,
    is_active    INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS dim_cause (
    cause_id        INTEGER PRIMARY KEY,
    cause_code      TEXT NOT NULL UNIQUE,
    cause_name      TEXT NOT NULL,
    cause_category  TEXT NOT NULL,
    is_respiratory  INTEGER NOT NULL DEFAULT 0,
    is_active       INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS dim_discharge (
    discharge_id        INTEGER PRIMARY KEY,
    discharge_code      TEXT NOT NULL UNIQUE,
    discharge_name      TEXT NOT NULL,
    discharge_category  TEXT NOT NULL,
    is_respiratory      INTEGER NOT NULL DEFAULT 0,
    is_active           INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS fact_emissions (
    region_id     INTEGER NOT NULL REFERENCES dim_region(region_id),
    year          INTEGER NOT NULL REFERENCES dim_time(year),
    sector_id     INTEGER NOT NULL REFERENCES dim_sector(sector_id),
    gas_id        INTEGER NOT NULL REFERENCES dim_gas(gas_id),
    emissions_kt  REAL NOT NULL,
    PRIMARY KEY (region_id, year, sector_id, gas_id)
);

CREATE TABLE IF NOT EXISTS fact_causes_of_death (
    region_id      INTEGER NOT NULL REFERENCES dim_region(region_id),
    year           INTEGER NOT NULL REFERENCES dim_time(year),
    cause_id       INTEGER NOT NULL REFERENCES dim_cause(cause_id),
    rate_per_100k  REAL NOT NULL,
    PRIMARY KEY (region_id, year, cause_id)
);

CREATE TABLE IF NOT EXISTS fact_hospital_discharges (
    region_id                INTEGER NOT NULL REFERENCES dim_region(region_id),
    year                     INTEGER NOT NULL REFERENCES dim_time(year),
    discharge_id             INTEGER NOT NULL REFERENCES dim_discharge(discharge_id),
    discharge_count          REAL NOT NULL,
    discharge_rate_per_100k  REAL,
    PRIMARY KEY (region_id, year, discharge_id)
);

CREATE TABLE IF NOT EXISTS fact_population (
    region_id   INTEGER NOT NULL REFERENCES dim_region(region_id),
    year        INTEGER NOT NULL REFERENCES dim_time(year),
    population  REAL NOT NULL,
    PRIMARY KEY (region_id, year)
);

CREATE INDEX IF NOT EXISTS idx_fact_emissions_year ON fact_emissions(year);
CREATE INDEX IF NOT EXISTS idx_fact_causes_year ON fact_causes_of_death(year);
CREATE INDEX IF NOT EXISTS idx_fact_discharges_year ON fact_hospital_discharges(year);
CREATE INDEX IF NOT EXISTS idx_fact_population_year ON fact_population(year);
";

/// Read-only convenience views, one per fact family, pre-joining the
/// dimensions, plus the per-capita emissions join.
pub const VIEWS: &str = "
CREATE VIEW IF NOT EXISTS v_emissions AS
SELECT
    r.region_code,
    COALESCE(r.region_label, CASE WHEN r.region_level = 0 THEN r.country_name END, r.region_code) AS region_label,
    r.region_level,
    r.country_iso,
    r.country_name,
    t.year,
    t.decade,
    s.sector_code,
    s.sector_name,
    s.sector_group,
    g.gas_code,
    g.gas_name,
    g.gwp_ar5,
    f.emissions_kt
FROM fact_emissions f
JOIN dim_region r ON r.region_id = f.region_id
JOIN dim_time t ON t.year = f.year
JOIN dim_sector s ON s.sector_id = f.sector_id
JOIN dim_gas g ON g.gas_id = f.gas_id;

CREATE VIEW IF NOT EXISTS v_causes_of_death AS
SELECT
    r.region_code,
    COALESCE(r.region_label, CASE WHEN r.region_level = 0 THEN r.country_name END, r.region_code) AS region_label,
    r.region_level,
    t.year,
    c.cause_code,
    c.cause_name,
    c.cause_category,
    c.is_respiratory,
    f.rate_per_100k
FROM fact_causes_of_death f
JOIN dim_region r ON r.region_id = f.region_id
JOIN dim_time t ON t.year = f.year
JOIN dim_cause c ON c.cause_id = f.cause_id;

CREATE VIEW IF NOT EXISTS v_hospital_discharges AS
SELECT
    r.region_code,
    COALESCE(r.region_label, CASE WHEN r.region_level = 0 THEN r.country_name END, r.region_code) AS region_label,
    r.region_level,
    t.year,
    d.discharge_code,
    d.discharge_name,
    d.discharge_category,
    d.is_respiratory,
    f.discharge_count,
    f.discharge_rate_per_100k
FROM fact_hospital_discharges f
JOIN dim_region r ON r.region_id = f.region_id
JOIN dim_time t ON t.year = f.year
JOIN dim_discharge d ON d.discharge_id = f.discharge_id;

CREATE VIEW IF NOT EXISTS v_population AS
SELECT
    r.region_code,
    COALESCE(r.region_label, CASE WHEN r.region_level = 0 THEN r.country_name END, r.region_code) AS region_label,
    r.region_level,
    r.country_iso,
    t.year,
    f.population
FROM fact_population f
JOIN dim_region r ON r.region_id = f.region_id
JOIN dim_time t ON t.year = f.year;

CREATE VIEW IF NOT EXISTS v_emissions_per_capita AS
SELECT
    r.region_code,
    COALESCE(r.region_label, CASE WHEN r.region_level = 0 THEN r.country_name END, r.region_code) AS region_label,
    f.year,
    SUM(f.emissions_kt) AS total_emissions_kt,
    p.population,
    SUM(f.emissions_kt) * 1000.0 / p.population AS emissions_tonnes_per_capita
FROM fact_emissions f
JOIN dim_region r ON r.region_id = f.region_id
JOIN fact_population p ON p.region_id = f.region_id AND p.year = f.year
GROUP BY f.region_id, f.year;
";
