//! Records produced by the extractors, before QC normalization.
//!
//! Fill values are already `None` at this point; QC codes are still raw
//! bytes.

use chrono::{DateTime, Utc};

use crate::qc::RawQc;
use crate::vocab::{DataFamily, DataMode, Direction, Parameter};

/// A latitude/longitude pair with its raw position QC.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawPosition {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub qc: RawQc,
}

/// One parameter value at one level.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawValue {
    pub value: Option<f64>,
    pub qc: RawQc,
    pub adjusted: Option<f64>,
    pub adjusted_qc: RawQc,
    pub adjusted_error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorInfo {
    pub sensor: String,
    pub maker: Option<String>,
    pub model: Option<String>,
    pub serial_no: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub parameter: String,
    pub sensor: Option<String>,
    pub units: Option<String>,
    pub accuracy: Option<String>,
    pub resolution: Option<String>,
    pub calibration_equation: Option<String>,
    pub calibration_coefficient: Option<String>,
    pub calibration_comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchConfigEntry {
    pub name: String,
    pub value: Option<f64>,
}

/// One configuration parameter of one mission (`CONFIG_PARAMETER_*`).
#[derive(Debug, Clone, PartialEq)]
pub struct MissionConfigEntry {
    pub mission_number: Option<i64>,
    pub mission_comment: Option<String>,
    pub name: String,
    pub value: f64,
}

/// One processing step from the `HISTORY_*` variables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryEntry {
    pub institution: Option<String>,
    pub step: Option<String>,
    pub software: Option<String>,
    pub software_release: Option<String>,
    pub reference: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub action: Option<String>,
    pub parameter: Option<String>,
    pub start_pres: Option<f64>,
    pub stop_pres: Option<f64>,
    pub previous_value: Option<f64>,
    pub qctest: Option<String>,
}

/// Contents of a `*_meta.nc` file.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatMetadata {
    pub source_file: String,
    pub platform_number: String,
    pub project_name: Option<String>,
    pub pi_name: Option<String>,
    pub data_centre: Option<String>,
    pub platform_type: Option<String>,
    pub platform_maker: Option<String>,
    pub float_serial_no: Option<String>,
    pub firmware_version: Option<String>,
    pub wmo_inst_type: Option<String>,
    pub positioning_system: Option<String>,
    pub launch_date: Option<DateTime<Utc>>,
    pub launch_position: RawPosition,
    pub start_date: Option<DateTime<Utc>>,
    pub end_mission_date: Option<DateTime<Utc>>,
    pub end_mission_status: Option<String>,
    pub date_update: Option<DateTime<Utc>>,
    pub sensors: Vec<SensorInfo>,
    pub parameters: Vec<ParameterInfo>,
    pub launch_config: Vec<LaunchConfigEntry>,
    /// Mission by mission, parameters in file order.
    pub mission_config: Vec<MissionConfigEntry>,
    pub history: Vec<HistoryEntry>,
}

/// Profile-level quality grades (`A`..`F`), one per core parameter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileGrades {
    pub pres: Option<char>,
    pub temp: Option<char>,
    pub psal: Option<char>,
}

/// One pressure level of a profile. Samples follow [`Parameter::ALL`]
/// order and only cover parameters present in the file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawLevel {
    pub samples: Vec<(Parameter, RawValue)>,
}

impl RawLevel {
    pub fn sample(&self, parameter: Parameter) -> Option<&RawValue> {
        self.samples
            .iter()
            .find(|(p, _)| *p == parameter)
            .map(|(_, v)| v)
    }
}

/// One vertical profile (one cycle) from a profile file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub source_file: String,
    pub platform_number: String,
    pub cycle_number: i64,
    pub family: DataFamily,
    pub direction: Direction,
    pub data_mode: Option<DataMode>,
    pub juld: Option<DateTime<Utc>>,
    pub juld_qc: RawQc,
    pub position: RawPosition,
    pub vertical_sampling_scheme: Option<String>,
    pub config_mission_number: Option<i64>,
    pub grades: ProfileGrades,
    pub levels: Vec<RawLevel>,
}

/// A located, timed measurement from a trajectory file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTrajectoryPoint {
    pub juld: DateTime<Utc>,
    pub juld_qc: RawQc,
    pub latitude: f64,
    pub longitude: f64,
    pub position_qc: RawQc,
    pub cycle_number: Option<i64>,
    pub measurement_code: Option<i64>,
}

/// An in-water sample from the `N_MEASUREMENT` dimension of a trajectory
/// file. Samples only cover parameters with a value.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTrajectoryMeasurement {
    /// Position along `N_MEASUREMENT`.
    pub measurement_index: i64,
    pub cycle_number: i64,
    pub measurement_code: Option<i64>,
    pub juld: Option<DateTime<Utc>>,
    pub samples: Vec<(Parameter, RawValue)>,
}

/// Per-cycle timing summary from the `N_CYCLE` dimension of a
/// trajectory file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrajectoryCycle {
    pub cycle_number: i64,
    pub data_mode: Option<DataMode>,
    pub descent_start: Option<DateTime<Utc>>,
    pub park_start: Option<DateTime<Utc>>,
    pub ascent_start: Option<DateTime<Utc>>,
    pub ascent_end: Option<DateTime<Utc>>,
    pub transmission_start: Option<DateTime<Utc>>,
    pub first_location: Option<DateTime<Utc>>,
    pub last_location: Option<DateTime<Utc>>,
    pub grounded: Option<char>,
    pub park_pressure: Option<f64>,
    pub config_mission_number: Option<i64>,
}

/// Contents of a `*_traj.nc` file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryRecord {
    pub source_file: String,
    pub platform_number: String,
    pub family: DataFamily,
    /// Sorted by time, one point per timestamp.
    pub points: Vec<RawTrajectoryPoint>,
    pub cycles: Vec<TrajectoryCycle>,
    /// In file order.
    pub measurements: Vec<RawTrajectoryMeasurement>,
    pub history: Vec<HistoryEntry>,
}

/// Output of any extractor.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedRecord {
    Metadata(FloatMetadata),
    Profile(ProfileRecord),
    Trajectory(TrajectoryRecord),
}

impl ExtractedRecord {
    pub fn platform_number(&self) -> &str {
        match self {
            ExtractedRecord::Metadata(m) => &m.platform_number,
            ExtractedRecord::Profile(p) => &p.platform_number,
            ExtractedRecord::Trajectory(t) => &t.platform_number,
        }
    }

    pub fn source_file(&self) -> &str {
        match self {
            ExtractedRecord::Metadata(m) => &m.source_file,
            ExtractedRecord::Profile(p) => &p.source_file,
            ExtractedRecord::Trajectory(t) => &t.source_file,
        }
    }
}
