pub mod assemble;
pub mod coverage;
pub mod derive;
pub mod error;
pub mod reconcile;

pub use assemble::{
    Assembled, OverwritePolicy, assemble_causes, assemble_discharges, assemble_emissions,
    assemble_population,
};
pub use coverage::{FamilyYears, compute_coverage};
pub use derive::apply_discharge_rates;
pub use error::{HarmonizeError, Result};
pub use reconcile::{
    EmissionsDimensions, Icd10Dimensions, RegionCatalog, reconcile_causes, reconcile_discharges,
    reconcile_emissions, reconcile_population,
};
