//! Record heap: one file of fixed-size slot arrays, one per record kind.
//!
//! - [`HeapStore`] - the file, its header and slot-level CRUD
//! - [`Record`] - encoding and liveness rules of a record kind
//! - [`records`] - the seven record kinds

mod header;
mod record;
pub mod records;
mod store;

pub use header::TableInfo;
pub use record::{Record, SlotLocation};
pub use records::{
    DocumentMetadata, DriverProfile, ExpenseCategory, ExpenseRecord, IncidentReport,
    IncidentType, MaintenanceRecord, MaintenanceType, TripRecord, UserRole, VehicleInfo,
    VehicleType,
};
pub use store::{HeapStats, HeapStore, TableStats};
