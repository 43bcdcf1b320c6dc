//! Writers that map normalized records onto the schema.
//!
//! Every function runs on the connection of an open file transaction.
//! Rows are compared with what is stored before anything is written, so
//! re-applying an unchanged record performs no writes at all.

use chrono::{DateTime, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Row, Sqlite, SqliteConnection};
use tracing::debug;

use argo_common::{
    DataFamily, HistoryEntry, NormalizedMetadata, NormalizedProfile, NormalizedTrajectory,
    QcFlag, QcValue, TrajectoryCycle,
};

use crate::error::{StorageError, StorageResult};
use crate::summary::UpsertOutcome;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Stable identifier of a cycle: platform number and zero-padded cycle
/// number, e.g. `5904471_012`.
pub fn cycle_id(platform_number: &str, cycle_number: i64) -> String {
    format!("{platform_number}_{cycle_number:03}")
}

// ============================================================================
// Generic row plumbing
// ============================================================================

/// A row identified by key columns, upserted only when its content differs.
trait KeyedRow: for<'r> FromRow<'r, SqliteRow> + PartialEq + Send + Sync + Unpin {
    type Key: Sync;
    const TABLE: &'static str;
    const KEY_COLUMNS: &'static [&'static str];
    const COLUMNS: &'static [&'static str];

    fn bind_key<'q>(key: &'q Self::Key, query: SqliteQuery<'q>) -> SqliteQuery<'q>;
    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;
}

/// A row owned by a float and replaced as an ordered set.
///
/// `SCOPE_COLUMNS` split one float's rows into independent sets, e.g. one
/// per data family, so that writing one set never touches another.
trait FloatChildRow: for<'r> FromRow<'r, SqliteRow> + PartialEq + Send + Sync + Unpin {
    const TABLE: &'static str;
    const SCOPE_COLUMNS: &'static [&'static str] = &[];
    const INDEX_COLUMN: &'static str;
    const COLUMNS: &'static [&'static str];

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;
}

fn key_predicate(keys: &[&str]) -> String {
    keys.iter()
        .map(|k| format!("{k} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

async fn upsert_row<R: KeyedRow>(
    conn: &mut SqliteConnection,
    key: &R::Key,
    row: &R,
) -> StorageResult<UpsertOutcome> {
    let select = format!(
        "SELECT {} FROM {} WHERE {}",
        R::COLUMNS.join(", "),
        R::TABLE,
        key_predicate(R::KEY_COLUMNS)
    );
    let existing = R::bind_key(key, sqlx::query(&select))
        .fetch_optional(&mut *conn)
        .await?
        .map(|r| R::from_row(&r))
        .transpose()?;

    match existing {
        Some(current) if current == *row => Ok(UpsertOutcome::Unchanged),
        Some(_) => {
            let assignments = R::COLUMNS
                .iter()
                .map(|c| format!("{c} = ?"))
                .collect::<Vec<_>>()
                .join(", ");
            let update = format!(
                "UPDATE {} SET {} WHERE {}",
                R::TABLE,
                assignments,
                key_predicate(R::KEY_COLUMNS)
            );
            R::bind_key(key, row.bind_columns(sqlx::query(&update)))
                .execute(&mut *conn)
                .await?;
            Ok(UpsertOutcome::Updated)
        }
        None => {
            let insert = format!(
                "INSERT INTO {} ({}, {}) VALUES ({})",
                R::TABLE,
                R::COLUMNS.join(", "),
                R::KEY_COLUMNS.join(", "),
                placeholders(R::COLUMNS.len() + R::KEY_COLUMNS.len())
            );
            R::bind_key(key, row.bind_columns(sqlx::query(&insert)))
                .execute(&mut *conn)
                .await?;
            Ok(UpsertOutcome::Created)
        }
    }
}

fn bind_owner<'q>(query: SqliteQuery<'q>, platform_number: &'q str, scope: &[&'q str]) -> SqliteQuery<'q> {
    scope
        .iter()
        .fold(query.bind(platform_number), |query, value| query.bind(*value))
}

/// Replace one set of a float's child rows when the stored set differs.
/// `scope` holds one value per [`FloatChildRow::SCOPE_COLUMNS`] entry.
/// Returns whether anything was written.
async fn sync_children<R: FloatChildRow>(
    conn: &mut SqliteConnection,
    platform_number: &str,
    scope: &[&str],
    rows: &[R],
) -> StorageResult<bool> {
    debug_assert_eq!(scope.len(), R::SCOPE_COLUMNS.len(), "{} scope", R::TABLE);
    let owner: Vec<&str> = std::iter::once("platform_number")
        .chain(R::SCOPE_COLUMNS.iter().copied())
        .collect();

    let select = format!(
        "SELECT {} FROM {} WHERE {} ORDER BY {}",
        R::COLUMNS.join(", "),
        R::TABLE,
        key_predicate(&owner),
        R::INDEX_COLUMN
    );
    let existing = bind_owner(sqlx::query(&select), platform_number, scope)
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(|r| R::from_row(r))
        .collect::<Result<Vec<R>, _>>()?;

    if existing.as_slice() == rows {
        return Ok(false);
    }

    let delete = format!("DELETE FROM {} WHERE {}", R::TABLE, key_predicate(&owner));
    bind_owner(sqlx::query(&delete), platform_number, scope)
        .execute(&mut *conn)
        .await?;

    let insert = format!(
        "INSERT INTO {} ({}, {}, {}) VALUES ({})",
        R::TABLE,
        owner.join(", "),
        R::INDEX_COLUMN,
        R::COLUMNS.join(", "),
        placeholders(owner.len() + 1 + R::COLUMNS.len())
    );
    for (index, row) in rows.iter().enumerate() {
        let query = bind_owner(sqlx::query(&insert), platform_number, scope).bind(index as i64);
        row.bind_columns(query).execute(&mut *conn).await?;
    }
    Ok(true)
}

/// Family recorded on an existing header row.
async fn stored_family<R: KeyedRow>(
    conn: &mut SqliteConnection,
    key: &R::Key,
) -> StorageResult<Option<String>> {
    let select = format!(
        "SELECT family FROM {} WHERE {}",
        R::TABLE,
        key_predicate(R::KEY_COLUMNS)
    );
    let row = R::bind_key(key, sqlx::query(&select))
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|r| r.try_get::<String, _>("family")).transpose()?)
}

/// Upsert a header row that core and BGC files both describe. Once a core
/// file has written the header, BGC files leave it as it is.
async fn upsert_shared_header<R: KeyedRow>(
    conn: &mut SqliteConnection,
    key: &R::Key,
    row: &R,
    family: DataFamily,
) -> StorageResult<UpsertOutcome> {
    if family == DataFamily::Bgc {
        let owner = stored_family::<R>(conn, key).await?;
        if owner.as_deref() == Some(DataFamily::Core.as_str()) {
            return Ok(UpsertOutcome::Unchanged);
        }
    }
    upsert_row(conn, key, row).await
}

async fn ensure_float(
    conn: &mut SqliteConnection,
    platform_number: &str,
    context: &str,
) -> StorageResult<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM floats WHERE platform_number = ?")
        .bind(platform_number)
        .fetch_optional(&mut *conn)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(StorageError::ReferentialIntegrity {
            platform_number: platform_number.to_string(),
            context: context.to_string(),
        }),
    }
}

fn code(flag: QcFlag) -> String {
    flag.as_str().to_string()
}

/// Audit columns of one stored value.
#[derive(Debug, Clone, PartialEq, FromRow)]
struct ValueColumns {
    value: Option<f64>,
    qc: String,
    value_source: String,
    raw_value: Option<f64>,
    raw_qc: String,
    adjusted_value: Option<f64>,
    adjusted_qc: Option<String>,
    adjusted_error: Option<f64>,
}

impl ValueColumns {
    fn new(v: &QcValue) -> Self {
        Self {
            value: v.value,
            qc: code(v.qc),
            value_source: v.source.as_str().to_string(),
            raw_value: v.raw,
            raw_qc: code(v.raw_qc),
            adjusted_value: v.adjusted,
            adjusted_qc: v.adjusted_qc.map(code),
            adjusted_error: v.adjusted_error,
        }
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.value)
            .bind(&self.qc)
            .bind(&self.value_source)
            .bind(self.raw_value)
            .bind(&self.raw_qc)
            .bind(self.adjusted_value)
            .bind(&self.adjusted_qc)
            .bind(self.adjusted_error)
    }
}

// ============================================================================
// Floats
// ============================================================================

#[derive(Debug, Clone, PartialEq, FromRow)]
struct FloatFields {
    project_name: Option<String>,
    pi_name: Option<String>,
    data_centre: Option<String>,
    platform_type: Option<String>,
    platform_maker: Option<String>,
    float_serial_no: Option<String>,
    firmware_version: Option<String>,
    wmo_inst_type: Option<String>,
    positioning_system: Option<String>,
    launch_date: Option<DateTime<Utc>>,
    launch_latitude: Option<f64>,
    launch_longitude: Option<f64>,
    launch_qc: String,
    start_date: Option<DateTime<Utc>>,
    end_mission_date: Option<DateTime<Utc>>,
    end_mission_status: Option<String>,
    date_update: Option<DateTime<Utc>>,
    status: String,
    source_file: String,
}

impl FloatFields {
    fn from_metadata(normalized: &NormalizedMetadata) -> Self {
        let m = &normalized.metadata;
        let ended = m.end_mission_status.is_some() || m.end_mission_date.is_some();
        Self {
            project_name: m.project_name.clone(),
            pi_name: m.pi_name.clone(),
            data_centre: m.data_centre.clone(),
            platform_type: m.platform_type.clone(),
            platform_maker: m.platform_maker.clone(),
            float_serial_no: m.float_serial_no.clone(),
            firmware_version: m.firmware_version.clone(),
            wmo_inst_type: m.wmo_inst_type.clone(),
            positioning_system: m.positioning_system.clone(),
            launch_date: m.launch_date,
            launch_latitude: normalized.launch_position.latitude,
            launch_longitude: normalized.launch_position.longitude,
            launch_qc: code(normalized.launch_position.qc),
            start_date: m.start_date,
            end_mission_date: m.end_mission_date,
            end_mission_status: m.end_mission_status.clone(),
            date_update: m.date_update,
            status: if ended { "ended" } else { "active" }.to_string(),
            source_file: m.source_file.clone(),
        }
    }
}

impl KeyedRow for FloatFields {
    type Key = String;
    const TABLE: &'static str = "floats";
    const KEY_COLUMNS: &'static [&'static str] = &["platform_number"];
    const COLUMNS: &'static [&'static str] = &[
        "project_name",
        "pi_name",
        "data_centre",
        "platform_type",
        "platform_maker",
        "float_serial_no",
        "firmware_version",
        "wmo_inst_type",
        "positioning_system",
        "launch_date",
        "launch_latitude",
        "launch_longitude",
        "launch_qc",
        "start_date",
        "end_mission_date",
        "end_mission_status",
        "date_update",
        "status",
        "source_file",
    ];

    fn bind_key<'q>(key: &'q String, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(key)
    }

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&self.project_name)
            .bind(&self.pi_name)
            .bind(&self.data_centre)
            .bind(&self.platform_type)
            .bind(&self.platform_maker)
            .bind(&self.float_serial_no)
            .bind(&self.firmware_version)
            .bind(&self.wmo_inst_type)
            .bind(&self.positioning_system)
            .bind(self.launch_date)
            .bind(self.launch_latitude)
            .bind(self.launch_longitude)
            .bind(&self.launch_qc)
            .bind(self.start_date)
            .bind(self.end_mission_date)
            .bind(&self.end_mission_status)
            .bind(self.date_update)
            .bind(&self.status)
            .bind(&self.source_file)
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
struct SensorRow {
    sensor: String,
    maker: Option<String>,
    model: Option<String>,
    serial_no: Option<String>,
}

impl FloatChildRow for SensorRow {
    const TABLE: &'static str = "float_sensors";
    const INDEX_COLUMN: &'static str = "sensor_index";
    const COLUMNS: &'static [&'static str] = &["sensor", "maker", "model", "serial_no"];

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&self.sensor)
            .bind(&self.maker)
            .bind(&self.model)
            .bind(&self.serial_no)
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
struct ParameterRow {
    parameter: String,
    sensor: Option<String>,
    units: Option<String>,
    accuracy: Option<String>,
    resolution: Option<String>,
    calibration_equation: Option<String>,
    calibration_coefficient: Option<String>,
    calibration_comment: Option<String>,
}

impl FloatChildRow for ParameterRow {
    const TABLE: &'static str = "float_parameters";
    const INDEX_COLUMN: &'static str = "parameter_index";
    const COLUMNS: &'static [&'static str] = &[
        "parameter",
        "sensor",
        "units",
        "accuracy",
        "resolution",
        "calibration_equation",
        "calibration_coefficient",
        "calibration_comment",
    ];

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&self.parameter)
            .bind(&self.sensor)
            .bind(&self.units)
            .bind(&self.accuracy)
            .bind(&self.resolution)
            .bind(&self.calibration_equation)
            .bind(&self.calibration_coefficient)
            .bind(&self.calibration_comment)
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
struct LaunchConfigRow {
    name: String,
    value: Option<f64>,
}

impl FloatChildRow for LaunchConfigRow {
    const TABLE: &'static str = "launch_config";
    const INDEX_COLUMN: &'static str = "config_index";
    const COLUMNS: &'static [&'static str] = &["name", "value"];

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(&self.name).bind(self.value)
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
struct MissionConfigRow {
    mission_number: Option<i64>,
    mission_comment: Option<String>,
    name: String,
    value: f64,
}

impl FloatChildRow for MissionConfigRow {
    const TABLE: &'static str = "mission_config";
    const INDEX_COLUMN: &'static str = "config_index";
    const COLUMNS: &'static [&'static str] = &["mission_number", "mission_comment", "name", "value"];

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.mission_number)
            .bind(&self.mission_comment)
            .bind(&self.name)
            .bind(self.value)
    }
}

/// History of one file kind and family. Metadata and trajectory files
/// each carry their own.
#[derive(Debug, Clone, PartialEq, FromRow)]
struct HistoryRow {
    institution: Option<String>,
    step: Option<String>,
    software: Option<String>,
    software_release: Option<String>,
    reference: Option<String>,
    date: Option<DateTime<Utc>>,
    action: Option<String>,
    parameter: Option<String>,
    start_pres: Option<f64>,
    stop_pres: Option<f64>,
    previous_value: Option<f64>,
    qctest: Option<String>,
}

impl HistoryRow {
    fn rows(history: &[HistoryEntry]) -> Vec<Self> {
        history
            .iter()
            .map(|h| Self {
                institution: h.institution.clone(),
                step: h.step.clone(),
                software: h.software.clone(),
                software_release: h.software_release.clone(),
                reference: h.reference.clone(),
                date: h.date,
                action: h.action.clone(),
                parameter: h.parameter.clone(),
                start_pres: h.start_pres,
                stop_pres: h.stop_pres,
                previous_value: h.previous_value,
                qctest: h.qctest.clone(),
            })
            .collect()
    }
}

impl FloatChildRow for HistoryRow {
    const TABLE: &'static str = "float_history";
    const SCOPE_COLUMNS: &'static [&'static str] = &["origin", "family"];
    const INDEX_COLUMN: &'static str = "history_index";
    const COLUMNS: &'static [&'static str] = &[
        "institution",
        "step",
        "software",
        "software_release",
        "reference",
        "date",
        "action",
        "parameter",
        "start_pres",
        "stop_pres",
        "previous_value",
        "qctest",
    ];

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&self.institution)
            .bind(&self.step)
            .bind(&self.software)
            .bind(&self.software_release)
            .bind(&self.reference)
            .bind(self.date)
            .bind(&self.action)
            .bind(&self.parameter)
            .bind(self.start_pres)
            .bind(self.stop_pres)
            .bind(self.previous_value)
            .bind(&self.qctest)
    }
}

/// Create or revise a float from its metadata record. The platform
/// number is the key and is never rewritten.
pub(crate) async fn upsert_float(
    conn: &mut SqliteConnection,
    normalized: &NormalizedMetadata,
) -> StorageResult<UpsertOutcome> {
    let m = &normalized.metadata;
    let platform = m.platform_number.clone();

    let mut outcome = upsert_row(conn, &platform, &FloatFields::from_metadata(normalized)).await?;

    let sensors: Vec<SensorRow> = m
        .sensors
        .iter()
        .map(|s| SensorRow {
            sensor: s.sensor.clone(),
            maker: s.maker.clone(),
            model: s.model.clone(),
            serial_no: s.serial_no.clone(),
        })
        .collect();
    let parameters: Vec<ParameterRow> = m
        .parameters
        .iter()
        .map(|p| ParameterRow {
            parameter: p.parameter.clone(),
            sensor: p.sensor.clone(),
            units: p.units.clone(),
            accuracy: p.accuracy.clone(),
            resolution: p.resolution.clone(),
            calibration_equation: p.calibration_equation.clone(),
            calibration_coefficient: p.calibration_coefficient.clone(),
            calibration_comment: p.calibration_comment.clone(),
        })
        .collect();
    let launch_config: Vec<LaunchConfigRow> = m
        .launch_config
        .iter()
        .map(|c| LaunchConfigRow {
            name: c.name.clone(),
            value: c.value,
        })
        .collect();

    let mission_config: Vec<MissionConfigRow> = m
        .mission_config
        .iter()
        .map(|c| MissionConfigRow {
            mission_number: c.mission_number,
            mission_comment: c.mission_comment.clone(),
            name: c.name.clone(),
            value: c.value,
        })
        .collect();
    let history_scope = ["metadata", DataFamily::Core.as_str()];

    let mut children_changed = sync_children(conn, &platform, &[], &sensors).await?;
    children_changed |= sync_children(conn, &platform, &[], &parameters).await?;
    children_changed |= sync_children(conn, &platform, &[], &launch_config).await?;
    children_changed |= sync_children(conn, &platform, &[], &mission_config).await?;
    children_changed |=
        sync_children(conn, &platform, &history_scope, &HistoryRow::rows(&m.history)).await?;

    if children_changed && outcome == UpsertOutcome::Unchanged {
        outcome = UpsertOutcome::Updated;
    }

    debug!(platform = %platform, outcome = ?outcome, "Mapped float metadata");
    Ok(outcome)
}

// ============================================================================
// Cycles, levels and measurements
// ============================================================================

#[derive(Debug, Clone, PartialEq, FromRow)]
struct CycleFields {
    direction: String,
    data_mode: Option<String>,
    juld: Option<DateTime<Utc>>,
    juld_qc: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    position_qc: String,
    vertical_sampling_scheme: Option<String>,
    config_mission_number: Option<i64>,
    profile_pres_qc: Option<String>,
    profile_temp_qc: Option<String>,
    profile_psal_qc: Option<String>,
    family: String,
    source_file: String,
}

impl CycleFields {
    fn from_profile(p: &NormalizedProfile) -> Self {
        Self {
            direction: p.direction.as_str().to_string(),
            data_mode: p.data_mode.map(|m| m.as_str().to_string()),
            juld: p.juld,
            juld_qc: code(p.juld_qc),
            latitude: p.position.latitude,
            longitude: p.position.longitude,
            position_qc: code(p.position.qc),
            vertical_sampling_scheme: p.vertical_sampling_scheme.clone(),
            config_mission_number: p.config_mission_number,
            profile_pres_qc: p.grades.pres.map(String::from),
            profile_temp_qc: p.grades.temp.map(String::from),
            profile_psal_qc: p.grades.psal.map(String::from),
            family: p.family.as_str().to_string(),
            source_file: p.source_file.clone(),
        }
    }
}

struct CycleKey {
    cycle_id: String,
    platform_number: String,
    cycle_number: i64,
}

impl KeyedRow for CycleFields {
    type Key = CycleKey;
    const TABLE: &'static str = "cycles";
    const KEY_COLUMNS: &'static [&'static str] = &["cycle_id", "platform_number", "cycle_number"];
    const COLUMNS: &'static [&'static str] = &[
        "direction",
        "data_mode",
        "juld",
        "juld_qc",
        "latitude",
        "longitude",
        "position_qc",
        "vertical_sampling_scheme",
        "config_mission_number",
        "profile_pres_qc",
        "profile_temp_qc",
        "profile_psal_qc",
        "family",
        "source_file",
    ];

    fn bind_key<'q>(key: &'q CycleKey, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&key.cycle_id)
            .bind(&key.platform_number)
            .bind(key.cycle_number)
    }

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&self.direction)
            .bind(&self.data_mode)
            .bind(self.juld)
            .bind(&self.juld_qc)
            .bind(self.latitude)
            .bind(self.longitude)
            .bind(&self.position_qc)
            .bind(&self.vertical_sampling_scheme)
            .bind(self.config_mission_number)
            .bind(&self.profile_pres_qc)
            .bind(&self.profile_temp_qc)
            .bind(&self.profile_psal_qc)
            .bind(&self.family)
            .bind(&self.source_file)
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
struct MeasurementFields {
    level_index: i64,
    pressure: f64,
    parameter: String,
    #[sqlx(flatten)]
    values: ValueColumns,
}

fn measurement_rows(profile: &NormalizedProfile) -> Vec<MeasurementFields> {
    let mut rows = Vec::new();
    for (index, level) in profile.levels.iter().enumerate() {
        for (parameter, v) in &level.samples {
            if v.raw.is_none() && v.adjusted.is_none() {
                continue;
            }
            rows.push(MeasurementFields {
                level_index: index as i64,
                pressure: level.pressure,
                parameter: parameter.variable().to_string(),
                values: ValueColumns::new(v),
            });
        }
    }
    rows.sort_by(|a, b| {
        a.level_index
            .cmp(&b.level_index)
            .then_with(|| a.parameter.cmp(&b.parameter))
    });
    rows
}

/// Levels and measurements one family stored for a cycle.
async fn stored_levels(
    conn: &mut SqliteConnection,
    cycle_id: &str,
    family: DataFamily,
) -> StorageResult<(Vec<f64>, Vec<MeasurementFields>)> {
    let pressures: Vec<f64> = sqlx::query_scalar(
        "SELECT pressure FROM levels WHERE cycle_id = ? AND family = ? ORDER BY level_index",
    )
    .bind(cycle_id)
    .bind(family.as_str())
    .fetch_all(&mut *conn)
    .await?;

    let measurements = sqlx::query_as::<_, MeasurementFields>(
        "SELECT m.level_index, l.pressure, m.parameter, m.value, m.qc, m.value_source, \
         m.raw_value, m.raw_qc, m.adjusted_value, m.adjusted_qc, m.adjusted_error \
         FROM measurements m \
         JOIN levels l ON l.cycle_id = m.cycle_id AND l.family = m.family \
          AND l.level_index = m.level_index \
         WHERE m.cycle_id = ? AND m.family = ? \
         ORDER BY m.level_index, m.parameter",
    )
    .bind(cycle_id)
    .bind(family.as_str())
    .fetch_all(&mut *conn)
    .await?;

    Ok((pressures, measurements))
}

/// Replace one family's levels of a cycle. The other family's rows are
/// not touched.
async fn replace_levels(
    conn: &mut SqliteConnection,
    cycle_id: &str,
    family: DataFamily,
    pressures: &[f64],
    measurements: &[MeasurementFields],
) -> StorageResult<()> {
    let family = family.as_str();
    sqlx::query("DELETE FROM measurements WHERE cycle_id = ? AND family = ?")
        .bind(cycle_id)
        .bind(family)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM levels WHERE cycle_id = ? AND family = ?")
        .bind(cycle_id)
        .bind(family)
        .execute(&mut *conn)
        .await?;

    for (index, pressure) in pressures.iter().enumerate() {
        sqlx::query(
            "INSERT INTO levels (cycle_id, family, level_index, pressure) VALUES (?, ?, ?, ?)",
        )
        .bind(cycle_id)
        .bind(family)
        .bind(index as i64)
        .bind(pressure)
        .execute(&mut *conn)
        .await?;
    }

    for m in measurements {
        let insert = sqlx::query(
            "INSERT INTO measurements (cycle_id, family, level_index, parameter, value, qc, \
             value_source, raw_value, raw_qc, adjusted_value, adjusted_qc, adjusted_error) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(cycle_id)
        .bind(family)
        .bind(m.level_index)
        .bind(&m.parameter);
        m.values.bind(insert).execute(&mut *conn).await?;
    }
    Ok(())
}

/// Create or revise a cycle and its levels. Returns the outcome and the
/// number of levels written (zero when the stored levels already match).
pub(crate) async fn upsert_cycle(
    conn: &mut SqliteConnection,
    profile: &NormalizedProfile,
) -> StorageResult<(UpsertOutcome, usize)> {
    let platform = &profile.platform_number;
    let context = format!("profile cycle {}", profile.cycle_number);
    ensure_float(conn, platform, &context).await?;

    let key = CycleKey {
        cycle_id: cycle_id(platform, profile.cycle_number),
        platform_number: platform.clone(),
        cycle_number: profile.cycle_number,
    };
    let header = upsert_shared_header(
        conn,
        &key,
        &CycleFields::from_profile(profile),
        profile.family,
    )
    .await?;

    let pressures: Vec<f64> = profile.levels.iter().map(|l| l.pressure).collect();
    let measurements = measurement_rows(profile);

    let levels_changed = match header {
        UpsertOutcome::Created => true,
        _ => {
            let (stored_pressures, stored_measurements) =
                stored_levels(conn, &key.cycle_id, profile.family).await?;
            stored_pressures != pressures || stored_measurements != measurements
        }
    };

    let levels_written = if levels_changed {
        replace_levels(conn, &key.cycle_id, profile.family, &pressures, &measurements).await?;
        pressures.len()
    } else {
        0
    };

    if header == UpsertOutcome::Created {
        let linked = sqlx::query(
            "UPDATE trajectory_points SET cycle_id = ? \
             WHERE platform_number = ? AND cycle_number = ? AND cycle_id IS NULL",
        )
        .bind(&key.cycle_id)
        .bind(platform)
        .bind(profile.cycle_number)
        .execute(&mut *conn)
        .await?
        .rows_affected();
        if linked > 0 {
            debug!(cycle_id = %key.cycle_id, linked, "Linked trajectory points to new cycle");
        }
    }

    let outcome = match header {
        UpsertOutcome::Unchanged if levels_changed => UpsertOutcome::Updated,
        other => other,
    };

    debug!(
        cycle_id = %key.cycle_id,
        family = %profile.family,
        outcome = ?outcome,
        levels_written,
        "Mapped profile"
    );
    Ok((outcome, levels_written))
}

// ============================================================================
// Trajectories
// ============================================================================

#[derive(Debug, Clone, PartialEq, FromRow)]
struct TrajectoryCycleFields {
    data_mode: Option<String>,
    descent_start: Option<DateTime<Utc>>,
    park_start: Option<DateTime<Utc>>,
    ascent_start: Option<DateTime<Utc>>,
    ascent_end: Option<DateTime<Utc>>,
    transmission_start: Option<DateTime<Utc>>,
    first_location: Option<DateTime<Utc>>,
    last_location: Option<DateTime<Utc>>,
    grounded: Option<String>,
    park_pressure: Option<f64>,
    config_mission_number: Option<i64>,
    family: String,
    source_file: String,
}

impl TrajectoryCycleFields {
    fn from_cycle(c: &TrajectoryCycle, family: DataFamily, source_file: &str) -> Self {
        Self {
            data_mode: c.data_mode.map(|m| m.as_str().to_string()),
            descent_start: c.descent_start,
            park_start: c.park_start,
            ascent_start: c.ascent_start,
            ascent_end: c.ascent_end,
            transmission_start: c.transmission_start,
            first_location: c.first_location,
            last_location: c.last_location,
            grounded: c.grounded.map(String::from),
            park_pressure: c.park_pressure,
            config_mission_number: c.config_mission_number,
            family: family.as_str().to_string(),
            source_file: source_file.to_string(),
        }
    }
}

impl KeyedRow for TrajectoryCycleFields {
    type Key = (String, i64);
    const TABLE: &'static str = "trajectory_cycles";
    const KEY_COLUMNS: &'static [&'static str] = &["platform_number", "cycle_number"];
    const COLUMNS: &'static [&'static str] = &[
        "data_mode",
        "descent_start",
        "park_start",
        "ascent_start",
        "ascent_end",
        "transmission_start",
        "first_location",
        "last_location",
        "grounded",
        "park_pressure",
        "config_mission_number",
        "family",
        "source_file",
    ];

    fn bind_key<'q>(key: &'q (String, i64), query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(&key.0).bind(key.1)
    }

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(&self.data_mode)
            .bind(self.descent_start)
            .bind(self.park_start)
            .bind(self.ascent_start)
            .bind(self.ascent_end)
            .bind(self.transmission_start)
            .bind(self.first_location)
            .bind(self.last_location)
            .bind(&self.grounded)
            .bind(self.park_pressure)
            .bind(self.config_mission_number)
            .bind(&self.family)
            .bind(&self.source_file)
    }
}

/// One parameter value of one in-water trajectory measurement.
#[derive(Debug, Clone, PartialEq, FromRow)]
struct TrajectorySampleRow {
    measurement_index: i64,
    cycle_number: i64,
    measurement_code: Option<i64>,
    juld: Option<DateTime<Utc>>,
    parameter: String,
    #[sqlx(flatten)]
    values: ValueColumns,
}

impl TrajectorySampleRow {
    fn rows(trajectory: &NormalizedTrajectory) -> Vec<Self> {
        trajectory
            .measurements
            .iter()
            .flat_map(|m| {
                m.samples.iter().map(move |(parameter, v)| Self {
                    measurement_index: m.measurement_index,
                    cycle_number: m.cycle_number,
                    measurement_code: m.measurement_code,
                    juld: m.juld,
                    parameter: parameter.variable().to_string(),
                    values: ValueColumns::new(v),
                })
            })
            .collect()
    }
}

impl FloatChildRow for TrajectorySampleRow {
    const TABLE: &'static str = "trajectory_measurements";
    const SCOPE_COLUMNS: &'static [&'static str] = &["family"];
    const INDEX_COLUMN: &'static str = "sample_index";
    const COLUMNS: &'static [&'static str] = &[
        "measurement_index",
        "cycle_number",
        "measurement_code",
        "juld",
        "parameter",
        "value",
        "qc",
        "value_source",
        "raw_value",
        "raw_qc",
        "adjusted_value",
        "adjusted_qc",
        "adjusted_error",
    ];

    fn bind_columns<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        let query = query
            .bind(self.measurement_index)
            .bind(self.cycle_number)
            .bind(self.measurement_code)
            .bind(self.juld)
            .bind(&self.parameter);
        self.values.bind(query)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TrajectoryWrite {
    pub points_inserted: usize,
    pub points_existing: usize,
    pub cycles_written: usize,
    pub measurements_written: usize,
    pub history_written: usize,
}

/// Record trajectory points (insert-if-absent, never updated), per-cycle
/// summaries (upserted) and the in-water measurements and history of the
/// trajectory's family (replaced when they differ).
pub(crate) async fn insert_trajectory(
    conn: &mut SqliteConnection,
    trajectory: &NormalizedTrajectory,
) -> StorageResult<TrajectoryWrite> {
    let platform = &trajectory.platform_number;
    let family = trajectory.family;
    ensure_float(conn, platform, "trajectory").await?;

    let mut written = TrajectoryWrite::default();

    for cycle in &trajectory.cycles {
        let key = (platform.clone(), cycle.cycle_number);
        let row = TrajectoryCycleFields::from_cycle(cycle, family, &trajectory.source_file);
        if upsert_shared_header(conn, &key, &row, family).await? != UpsertOutcome::Unchanged {
            written.cycles_written += 1;
        }
    }

    for point in &trajectory.points {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO trajectory_points \
             (platform_number, juld, juld_qc, latitude, longitude, position_qc, \
              cycle_number, measurement_code, cycle_id, source_file) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, \
              (SELECT cycle_id FROM cycles WHERE platform_number = ? AND cycle_number = ?), ?)",
        )
        .bind(platform)
        .bind(point.timestamp)
        .bind(point.timestamp_qc.as_str())
        .bind(point.latitude)
        .bind(point.longitude)
        .bind(point.position_qc.as_str())
        .bind(point.cycle_number)
        .bind(point.measurement_code)
        .bind(platform)
        .bind(point.cycle_number)
        .bind(&trajectory.source_file)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            written.points_inserted += 1;
        } else {
            written.points_existing += 1;
        }
    }

    let samples = TrajectorySampleRow::rows(trajectory);
    if sync_children(conn, platform, &[family.as_str()], &samples).await? {
        written.measurements_written = samples.len();
    }

    let history = HistoryRow::rows(&trajectory.history);
    if sync_children(conn, platform, &["trajectory", family.as_str()], &history).await? {
        written.history_written = history.len();
    }

    debug!(
        platform = %platform,
        family = %family,
        inserted = written.points_inserted,
        existing = written.points_existing,
        cycles = written.cycles_written,
        measurements = written.measurements_written,
        history = written.history_written,
        "Mapped trajectory"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_id_is_zero_padded() {
        assert_eq!(cycle_id("5904471", 12), "5904471_012");
        assert_eq!(cycle_id("5904471", 1234), "5904471_1234");
        assert_eq!(cycle_id("5904471", 0), "5904471_000");
    }

    #[test]
    fn test_trajectory_samples_follow_measurement_order() {
        use argo_common::{Parameter, TrajectoryMeasurement, ValueSource};

        let value = |v: f64| QcValue {
            value: Some(v),
            qc: QcFlag::Good,
            source: ValueSource::Raw,
            raw: Some(v),
            raw_qc: QcFlag::Good,
            adjusted: None,
            adjusted_qc: None,
            adjusted_error: None,
        };
        let trajectory = NormalizedTrajectory {
            source_file: "5904471_Rtraj.nc".into(),
            platform_number: "5904471".into(),
            family: DataFamily::Core,
            points: Vec::new(),
            cycles: Vec::new(),
            measurements: vec![
                TrajectoryMeasurement {
                    measurement_index: 7,
                    cycle_number: 12,
                    measurement_code: Some(290),
                    juld: None,
                    samples: vec![(Parameter::Pres, value(1000.0)), (Parameter::Temp, value(6.1))],
                },
                TrajectoryMeasurement {
                    measurement_index: 9,
                    cycle_number: 12,
                    measurement_code: Some(301),
                    juld: None,
                    samples: vec![(Parameter::Pres, value(1001.5))],
                },
            ],
            history: Vec::new(),
        };

        let rows = TrajectorySampleRow::rows(&trajectory);
        let keys: Vec<(i64, &str)> = rows
            .iter()
            .map(|r| (r.measurement_index, r.parameter.as_str()))
            .collect();
        assert_eq!(keys, vec![(7, "PRES"), (7, "TEMP"), (9, "PRES")]);
        assert_eq!(rows[2].values.value, Some(1001.5));
    }

    #[test]
    fn test_key_predicate() {
        assert_eq!(key_predicate(&["platform_number"]), "platform_number = ?");
        assert_eq!(
            key_predicate(&["platform_number", "cycle_number"]),
            "platform_number = ? AND cycle_number = ?"
        );
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
