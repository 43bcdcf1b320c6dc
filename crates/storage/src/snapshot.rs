//! Read-only queries over committed rows.
//!
//! This is the surface the dashboard and the semantic index builder
//! consume: plain rows in stable orders, no query language.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use argo_common::{QcFlag, VocabularyResult};

use crate::error::StorageResult;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct FloatRow {
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
    pub launch_latitude: Option<f64>,
    pub launch_longitude: Option<f64>,
    pub launch_qc: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_mission_date: Option<DateTime<Utc>>,
    pub end_mission_status: Option<String>,
    pub date_update: Option<DateTime<Utc>>,
    pub status: String,
    pub source_file: String,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct SensorRecordRow {
    pub sensor_index: i64,
    pub sensor: String,
    pub maker: Option<String>,
    pub model: Option<String>,
    pub serial_no: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct CycleRow {
    pub cycle_id: String,
    pub platform_number: String,
    pub cycle_number: i64,
    pub direction: String,
    pub data_mode: Option<String>,
    pub juld: Option<DateTime<Utc>>,
    pub juld_qc: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub position_qc: String,
    pub vertical_sampling_scheme: Option<String>,
    pub config_mission_number: Option<i64>,
    pub profile_pres_qc: Option<String>,
    pub profile_temp_qc: Option<String>,
    pub profile_psal_qc: Option<String>,
    pub family: String,
    pub source_file: String,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct LevelRow {
    pub cycle_id: String,
    pub family: String,
    pub level_index: i64,
    pub pressure: f64,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct MeasurementRow {
    pub cycle_id: String,
    pub family: String,
    pub level_index: i64,
    pub parameter: String,
    pub value: Option<f64>,
    pub qc: String,
    pub value_source: String,
    pub raw_value: Option<f64>,
    pub raw_qc: String,
    pub adjusted_value: Option<f64>,
    pub adjusted_qc: Option<String>,
    pub adjusted_error: Option<f64>,
}

impl MeasurementRow {
    pub fn qc_flag(&self) -> VocabularyResult<QcFlag> {
        QcFlag::from_code(&self.qc)
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct TrajectoryPointRow {
    pub platform_number: String,
    pub juld: DateTime<Utc>,
    pub juld_qc: String,
    pub latitude: f64,
    pub longitude: f64,
    pub position_qc: String,
    pub cycle_number: Option<i64>,
    pub measurement_code: Option<i64>,
    pub cycle_id: Option<String>,
    pub source_file: String,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct MissionConfigRow {
    pub config_index: i64,
    pub mission_number: Option<i64>,
    pub mission_comment: Option<String>,
    pub name: String,
    pub value: f64,
}

/// One processing step recorded by a metadata or trajectory file.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct HistoryRow {
    pub origin: String,
    pub family: String,
    pub history_index: i64,
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

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct TrajectoryMeasurementRow {
    pub platform_number: String,
    pub family: String,
    pub sample_index: i64,
    pub measurement_index: i64,
    pub cycle_number: i64,
    pub measurement_code: Option<i64>,
    pub juld: Option<DateTime<Utc>>,
    pub parameter: String,
    pub value: Option<f64>,
    pub qc: String,
    pub value_source: String,
    pub raw_value: Option<f64>,
    pub raw_qc: String,
    pub adjusted_value: Option<f64>,
    pub adjusted_qc: Option<String>,
    pub adjusted_error: Option<f64>,
}

/// Per-float rollup for the semantic index builder.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct FloatSummary {
    pub platform_number: String,
    pub project_name: Option<String>,
    pub platform_type: Option<String>,
    pub status: String,
    pub cycle_count: i64,
    pub first_profile: Option<DateTime<Utc>>,
    pub last_profile: Option<DateTime<Utc>>,
    pub min_latitude: Option<f64>,
    pub max_latitude: Option<f64>,
    pub min_longitude: Option<f64>,
    pub max_longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub floats: i64,
    pub float_sensors: i64,
    pub float_parameters: i64,
    pub launch_config: i64,
    pub mission_config: i64,
    pub float_history: i64,
    pub cycles: i64,
    pub levels: i64,
    pub measurements: i64,
    pub trajectory_cycles: i64,
    pub trajectory_points: i64,
    pub trajectory_measurements: i64,
}

/// Read-only view of the catalog.
#[derive(Clone)]
pub struct Snapshot {
    pool: SqlitePool,
}

impl Snapshot {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn count(&self, table: &str) -> StorageResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        Ok(sqlx::query_scalar(&sql).fetch_one(&self.pool).await?)
    }

    /// Row counts of every data table.
    pub async fn table_counts(&self) -> StorageResult<TableCounts> {
        Ok(TableCounts {
            floats: self.count("floats").await?,
            float_sensors: self.count("float_sensors").await?,
            float_parameters: self.count("float_parameters").await?,
            launch_config: self.count("launch_config").await?,
            mission_config: self.count("mission_config").await?,
            float_history: self.count("float_history").await?,
            cycles: self.count("cycles").await?,
            levels: self.count("levels").await?,
            measurements: self.count("measurements").await?,
            trajectory_cycles: self.count("trajectory_cycles").await?,
            trajectory_points: self.count("trajectory_points").await?,
            trajectory_measurements: self.count("trajectory_measurements").await?,
        })
    }

    pub async fn float(&self, platform_number: &str) -> StorageResult<Option<FloatRow>> {
        Ok(
            sqlx::query_as::<_, FloatRow>("SELECT * FROM floats WHERE platform_number = ?")
                .bind(platform_number)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn sensors(&self, platform_number: &str) -> StorageResult<Vec<SensorRecordRow>> {
        Ok(sqlx::query_as::<_, SensorRecordRow>(
            "SELECT sensor_index, sensor, maker, model, serial_no FROM float_sensors \
             WHERE platform_number = ? ORDER BY sensor_index",
        )
        .bind(platform_number)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn mission_config(&self, platform_number: &str) -> StorageResult<Vec<MissionConfigRow>> {
        Ok(sqlx::query_as::<_, MissionConfigRow>(
            "SELECT config_index, mission_number, mission_comment, name, value FROM mission_config \
             WHERE platform_number = ? ORDER BY config_index",
        )
        .bind(platform_number)
        .fetch_all(&self.pool)
        .await?)
    }

    /// History of a float grouped by the file kind and family that recorded it.
    pub async fn history(&self, platform_number: &str) -> StorageResult<Vec<HistoryRow>> {
        Ok(sqlx::query_as::<_, HistoryRow>(
            "SELECT origin, family, history_index, institution, step, software, software_release, \
             reference, date, action, parameter, start_pres, stop_pres, previous_value, qctest \
             FROM float_history WHERE platform_number = ? ORDER BY origin, family, history_index",
        )
        .bind(platform_number)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Cycles of a float ordered by cycle number.
    pub async fn cycles(&self, platform_number: &str) -> StorageResult<Vec<CycleRow>> {
        Ok(sqlx::query_as::<_, CycleRow>(
            "SELECT * FROM cycles WHERE platform_number = ? ORDER BY cycle_number",
        )
        .bind(platform_number)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Levels of a cycle in non-decreasing pressure order.
    pub async fn levels(&self, cycle_id: &str) -> StorageResult<Vec<LevelRow>> {
        Ok(sqlx::query_as::<_, LevelRow>(
            "SELECT cycle_id, family, level_index, pressure FROM levels \
             WHERE cycle_id = ? ORDER BY family, pressure, level_index",
        )
        .bind(cycle_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn measurements(&self, cycle_id: &str) -> StorageResult<Vec<MeasurementRow>> {
        Ok(sqlx::query_as::<_, MeasurementRow>(
            "SELECT * FROM measurements WHERE cycle_id = ? \
             ORDER BY family, level_index, parameter",
        )
        .bind(cycle_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Every stored measurement, for whole-catalog checks and exports.
    pub async fn all_measurements(&self) -> StorageResult<Vec<MeasurementRow>> {
        Ok(sqlx::query_as::<_, MeasurementRow>(
            "SELECT * FROM measurements ORDER BY cycle_id, family, level_index, parameter",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    /// Trajectory of a float in increasing time order.
    pub async fn trajectory(&self, platform_number: &str) -> StorageResult<Vec<TrajectoryPointRow>> {
        Ok(sqlx::query_as::<_, TrajectoryPointRow>(
            "SELECT * FROM trajectory_points WHERE platform_number = ? ORDER BY juld",
        )
        .bind(platform_number)
        .fetch_all(&self.pool)
        .await?)
    }

    /// In-water trajectory measurements in file order, core before BGC.
    pub async fn trajectory_measurements(
        &self,
        platform_number: &str,
    ) -> StorageResult<Vec<TrajectoryMeasurementRow>> {
        Ok(sqlx::query_as::<_, TrajectoryMeasurementRow>(
            "SELECT * FROM trajectory_measurements WHERE platform_number = ? \
             ORDER BY family DESC, sample_index",
        )
        .bind(platform_number)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn float_summaries(&self) -> StorageResult<Vec<FloatSummary>> {
        Ok(sqlx::query_as::<_, FloatSummary>(
            "SELECT f.platform_number, f.project_name, f.platform_type, f.status, \
             COUNT(c.cycle_id) AS cycle_count, \
             MIN(c.juld) AS first_profile, MAX(c.juld) AS last_profile, \
             MIN(c.latitude) AS min_latitude, MAX(c.latitude) AS max_latitude, \
             MIN(c.longitude) AS min_longitude, MAX(c.longitude) AS max_longitude \
             FROM floats f LEFT JOIN cycles c ON c.platform_number = f.platform_number \
             GROUP BY f.platform_number, f.project_name, f.platform_type, f.status \
             ORDER BY f.platform_number",
        )
        .fetch_all(&self.pool)
        .await?)
    }
}
