//! Shared application state.

pub mod store;
pub mod vehicle;

pub use store::{AppState, IngestError, IngestOutcome, StateUpdate};
pub use vehicle::{DashboardView, IngestSource, VehicleRecord, VehicleStatus};
