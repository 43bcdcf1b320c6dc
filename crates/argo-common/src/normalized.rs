//! Records after QC normalization, ready for the schema mapper.

use chrono::{DateTime, Utc};

use crate::qc::QcFlag;
use crate::record::{FloatMetadata, HistoryEntry, ProfileGrades, TrajectoryCycle};
use crate::vocab::{DataFamily, DataMode, Direction, Parameter};

/// Which input supplied [`QcValue::value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueSource {
    Raw,
    Adjusted,
}

impl ValueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueSource::Raw => "raw",
            ValueSource::Adjusted => "adjusted",
        }
    }
}

/// A measurement paired with its canonical QC flag.
///
/// `value`/`qc` are what consumers should use; the raw and adjusted
/// inputs are retained for audit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QcValue {
    pub value: Option<f64>,
    pub qc: QcFlag,
    pub source: ValueSource,
    pub raw: Option<f64>,
    pub raw_qc: QcFlag,
    pub adjusted: Option<f64>,
    pub adjusted_qc: Option<QcFlag>,
    pub adjusted_error: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub qc: QcFlag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLevel {
    /// Sort pressure in decibar (adjusted when present, else raw).
    pub pressure: f64,
    pub samples: Vec<(Parameter, QcValue)>,
}

impl NormalizedLevel {
    pub fn sample(&self, parameter: Parameter) -> Option<&QcValue> {
        self.samples
            .iter()
            .find(|(p, _)| *p == parameter)
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMetadata {
    pub metadata: FloatMetadata,
    pub launch_position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedProfile {
    pub source_file: String,
    pub platform_number: String,
    pub cycle_number: i64,
    pub family: DataFamily,
    pub direction: Direction,
    pub data_mode: Option<DataMode>,
    pub juld: Option<DateTime<Utc>>,
    pub juld_qc: QcFlag,
    pub position: Position,
    pub vertical_sampling_scheme: Option<String>,
    pub config_mission_number: Option<i64>,
    pub grades: ProfileGrades,
    /// Non-decreasing pressure order.
    pub levels: Vec<NormalizedLevel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPoint {
    pub timestamp: DateTime<Utc>,
    pub timestamp_qc: QcFlag,
    pub latitude: f64,
    pub longitude: f64,
    pub position_qc: QcFlag,
    pub cycle_number: Option<i64>,
    pub measurement_code: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryMeasurement {
    pub measurement_index: i64,
    pub cycle_number: i64,
    pub measurement_code: Option<i64>,
    pub juld: Option<DateTime<Utc>>,
    pub samples: Vec<(Parameter, QcValue)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTrajectory {
    pub source_file: String,
    pub platform_number: String,
    pub family: DataFamily,
    /// Strictly increasing timestamps.
    pub points: Vec<TrajectoryPoint>,
    pub cycles: Vec<TrajectoryCycle>,
    pub measurements: Vec<TrajectoryMeasurement>,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedRecord {
    Metadata(NormalizedMetadata),
    Profile(NormalizedProfile),
    Trajectory(NormalizedTrajectory),
}

impl NormalizedRecord {
    pub fn platform_number(&self) -> &str {
        match self {
            NormalizedRecord::Metadata(m) => &m.metadata.platform_number,
            NormalizedRecord::Profile(p) => &p.platform_number,
            NormalizedRecord::Trajectory(t) => &t.platform_number,
        }
    }
}
