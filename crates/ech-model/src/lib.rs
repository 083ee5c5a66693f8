pub mod error;
pub mod fact;
pub mod ids;
pub mod record;
pub mod region;
pub mod report;
pub mod time;

pub use error::{ModelError, Result};
pub use fact::{CauseOfDeathFact, DischargeFact, EmissionsFact, PopulationFact};
pub use ids::{sha256_hex, surrogate_key};
pub use record::{
    CauseOfDeathRecord, DischargeRecord, EmissionRecord, FactFamily, PopulationRecord,
};
pub use region::{Region, RegionLevel, normalize_region_code};
pub use report::{
    BatchStatus, FamilySummary, IssueSeverity, QualityIssue, RunReport, SAMPLE_LIMIT, SkipLog,
};
pub use time::{TimePeriod, YearCoverage, decade, is_leap_year};
