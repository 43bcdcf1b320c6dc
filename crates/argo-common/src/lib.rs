//! Common types and utilities shared across the ARGO ingestion crates.
//!
//! Holds the fixed ARGO vocabularies (QC flags, data modes, profile
//! directions, data families, measured parameters), JULD/date
//! conversion, and the transient record types passed between pipeline
//! stages.

pub mod error;
pub mod normalized;
pub mod qc;
pub mod record;
pub mod time;
pub mod vocab;

pub use error::{VocabularyError, VocabularyResult};
pub use normalized::{
    NormalizedLevel, NormalizedMetadata, NormalizedProfile, NormalizedRecord,
    NormalizedTrajectory, Position, QcValue, TrajectoryMeasurement, TrajectoryPoint, ValueSource,
};
pub use qc::{QcFlag, RawQc};
pub use record::{
    ExtractedRecord, FloatMetadata, HistoryEntry, LaunchConfigEntry, MissionConfigEntry,
    ParameterInfo, ProfileGrades, ProfileRecord, RawLevel, RawPosition, RawTrajectoryMeasurement,
    RawTrajectoryPoint, RawValue, SensorInfo, TrajectoryCycle, TrajectoryRecord,
};
pub use time::{datetime_to_juld, format_argo_date, juld_to_datetime, parse_argo_date};
pub use vocab::{DataFamily, DataMode, Direction, FileCategory, Parameter};
