pub mod error;
pub mod integrity;
pub mod loader;
pub mod schema;
pub mod store;

pub use error::{Result, WarehouseError};
pub use integrity::{IntegrityOptions, SectorTotals};
pub use loader::LoadStats;
pub use store::Warehouse;
