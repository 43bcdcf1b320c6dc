//! Storage for normalized ARGO data.
//!
//! Provides:
//! - SQLite catalog with the float / cycle / level / measurement /
//!   trajectory schema and seeded reference vocabularies
//! - Per-file transactions that map normalized records onto the schema
//! - Read-only snapshot queries for downstream consumers

pub mod catalog;
pub mod error;
mod mapper;
mod schema;
pub mod snapshot;
pub mod summary;

pub use catalog::{Catalog, CatalogOptions, FileTransaction};
pub use error::{StorageError, StorageResult};
pub use mapper::cycle_id;
pub use snapshot::{
    CycleRow, FloatRow, FloatSummary, HistoryRow, LevelRow, MeasurementRow, MissionConfigRow,
    SensorRecordRow, Snapshot, TableCounts, TrajectoryMeasurementRow, TrajectoryPointRow,
};
pub use summary::{MapSummary, UpsertOutcome};
