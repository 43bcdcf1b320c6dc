//! Relational schema for normalized ARGO data.
//!
//! Statements are separated by `;` and applied one at a time, so no
//! statement may contain a literal semicolon.

use sqlx::SqlitePool;

use argo_common::{DataMode, Parameter, QcFlag};

use crate::error::StorageResult;

pub(crate) const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS qc_flags (
    code TEXT PRIMARY KEY,
    label TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS data_modes (
    code TEXT PRIMARY KEY,
    label TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS parameter_catalog (
    name TEXT PRIMARY KEY,
    units TEXT NOT NULL,
    is_core INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS floats (
    platform_number TEXT PRIMARY KEY,
    project_name TEXT,
    pi_name TEXT,
    data_centre TEXT,
    platform_type TEXT,
    platform_maker TEXT,
    float_serial_no TEXT,
    firmware_version TEXT,
    wmo_inst_type TEXT,
    positioning_system TEXT,
    launch_date TEXT,
    launch_latitude REAL,
    launch_longitude REAL,
    launch_qc TEXT NOT NULL REFERENCES qc_flags(code),
    start_date TEXT,
    end_mission_date TEXT,
    end_mission_status TEXT,
    date_update TEXT,
    status TEXT NOT NULL,
    source_file TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS float_sensors (
    platform_number TEXT NOT NULL REFERENCES floats(platform_number),
    sensor_index INTEGER NOT NULL,
    sensor TEXT NOT NULL,
    maker TEXT,
    model TEXT,
    serial_no TEXT,
    PRIMARY KEY (platform_number, sensor_index)
);

CREATE TABLE IF NOT EXISTS float_parameters (
    platform_number TEXT NOT NULL REFERENCES floats(platform_number),
    parameter_index INTEGER NOT NULL,
    parameter TEXT NOT NULL,
    sensor TEXT,
    units TEXT,
    accuracy TEXT,
    resolution TEXT,
    calibration_equation TEXT,
    calibration_coefficient TEXT,
    calibration_comment TEXT,
    PRIMARY KEY (platform_number, parameter_index)
);

CREATE TABLE IF NOT EXISTS launch_config (
    platform_number TEXT NOT NULL REFERENCES floats(platform_number),
    config_index INTEGER NOT NULL,
    name TEXT NOT NULL,
    value REAL,
    PRIMARY KEY (platform_number, config_index)
);

CREATE TABLE IF NOT EXISTS mission_config (
    platform_number TEXT NOT NULL REFERENCES floats(platform_number),
    config_index INTEGER NOT NULL,
    mission_number INTEGER,
    mission_comment TEXT,
    name TEXT NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (platform_number, config_index)
);

CREATE TABLE IF NOT EXISTS float_history (
    platform_number TEXT NOT NULL REFERENCES floats(platform_number),
    origin TEXT NOT NULL,
    family TEXT NOT NULL,
    history_index INTEGER NOT NULL,
    institution TEXT,
    step TEXT,
    software TEXT,
    software_release TEXT,
    reference TEXT,
    date TEXT,
    action TEXT,
    parameter TEXT,
    start_pres REAL,
    stop_pres REAL,
    previous_value REAL,
    qctest TEXT,
    PRIMARY KEY (platform_number, origin, family, history_index)
);

CREATE TABLE IF NOT EXISTS cycles (
    cycle_id TEXT PRIMARY KEY,
    platform_number TEXT NOT NULL REFERENCES floats(platform_number),
    cycle_number INTEGER NOT NULL,
    direction TEXT NOT NULL,
    data_mode TEXT REFERENCES data_modes(code),
    juld TEXT,
    juld_qc TEXT NOT NULL REFERENCES qc_flags(code),
    latitude REAL,
    longitude REAL,
    position_qc TEXT NOT NULL REFERENCES qc_flags(code),
    vertical_sampling_scheme TEXT,
    config_mission_number INTEGER,
    profile_pres_qc TEXT,
    profile_temp_qc TEXT,
    profile_psal_qc TEXT,
    family TEXT NOT NULL,
    source_file TEXT NOT NULL,
    UNIQUE (platform_number, cycle_number)
);

CREATE TABLE IF NOT EXISTS levels (
    cycle_id TEXT NOT NULL REFERENCES cycles(cycle_id) ON DELETE CASCADE,
    family TEXT NOT NULL,
    level_index INTEGER NOT NULL,
    pressure REAL NOT NULL,
    PRIMARY KEY (cycle_id, family, level_index)
);

CREATE TABLE IF NOT EXISTS measurements (
    cycle_id TEXT NOT NULL,
    family TEXT NOT NULL,
    level_index INTEGER NOT NULL,
    parameter TEXT NOT NULL REFERENCES parameter_catalog(name),
    value REAL,
    qc TEXT NOT NULL REFERENCES qc_flags(code),
    value_source TEXT NOT NULL,
    raw_value REAL,
    raw_qc TEXT NOT NULL REFERENCES qc_flags(code),
    adjusted_value REAL,
    adjusted_qc TEXT REFERENCES qc_flags(code),
    adjusted_error REAL,
    PRIMARY KEY (cycle_id, family, level_index, parameter),
    FOREIGN KEY (cycle_id, family, level_index)
        REFERENCES levels(cycle_id, family, level_index) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS trajectory_cycles (
    platform_number TEXT NOT NULL REFERENCES floats(platform_number),
    cycle_number INTEGER NOT NULL,
    data_mode TEXT REFERENCES data_modes(code),
    descent_start TEXT,
    park_start TEXT,
    ascent_start TEXT,
    ascent_end TEXT,
    transmission_start TEXT,
    first_location TEXT,
    last_location TEXT,
    grounded TEXT,
    park_pressure REAL,
    config_mission_number INTEGER,
    family TEXT NOT NULL,
    source_file TEXT NOT NULL,
    PRIMARY KEY (platform_number, cycle_number)
);

CREATE TABLE IF NOT EXISTS trajectory_points (
    platform_number TEXT NOT NULL REFERENCES floats(platform_number),
    juld TEXT NOT NULL,
    juld_qc TEXT NOT NULL REFERENCES qc_flags(code),
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    position_qc TEXT NOT NULL REFERENCES qc_flags(code),
    cycle_number INTEGER,
    measurement_code INTEGER,
    cycle_id TEXT REFERENCES cycles(cycle_id) ON DELETE SET NULL,
    source_file TEXT NOT NULL,
    PRIMARY KEY (platform_number, juld)
);

CREATE TABLE IF NOT EXISTS trajectory_measurements (
    platform_number TEXT NOT NULL REFERENCES floats(platform_number),
    family TEXT NOT NULL,
    sample_index INTEGER NOT NULL,
    measurement_index INTEGER NOT NULL,
    cycle_number INTEGER NOT NULL,
    measurement_code INTEGER,
    juld TEXT,
    parameter TEXT NOT NULL REFERENCES parameter_catalog(name),
    value REAL,
    qc TEXT NOT NULL REFERENCES qc_flags(code),
    value_source TEXT NOT NULL,
    raw_value REAL,
    raw_qc TEXT NOT NULL REFERENCES qc_flags(code),
    adjusted_value REAL,
    adjusted_qc TEXT REFERENCES qc_flags(code),
    adjusted_error REAL,
    PRIMARY KEY (platform_number, family, sample_index),
    UNIQUE (platform_number, family, measurement_index, parameter)
);

CREATE INDEX IF NOT EXISTS idx_cycles_platform ON cycles(platform_number, cycle_number);
CREATE INDEX IF NOT EXISTS idx_levels_pressure ON levels(cycle_id, family, pressure);
CREATE INDEX IF NOT EXISTS idx_trajectory_cycle ON trajectory_points(platform_number, cycle_number);
CREATE INDEX IF NOT EXISTS idx_trajectory_measurement_cycle ON trajectory_measurements(platform_number, cycle_number)
"#;

/// Populate the reference vocabularies. Safe to run on every open.
pub(crate) async fn seed_vocabularies(pool: &SqlitePool) -> StorageResult<()> {
    for flag in QcFlag::ALL {
        sqlx::query("INSERT OR IGNORE INTO qc_flags (code, label) VALUES (?, ?)")
            .bind(flag.as_str())
            .bind(flag.label())
            .execute(pool)
            .await?;
    }

    for mode in DataMode::ALL {
        sqlx::query("INSERT OR IGNORE INTO data_modes (code, label) VALUES (?, ?)")
            .bind(mode.as_str())
            .bind(mode.label())
            .execute(pool)
            .await?;
    }

    for parameter in Parameter::ALL {
        sqlx::query("INSERT OR IGNORE INTO parameter_catalog (name, units, is_core) VALUES (?, ?, ?)")
            .bind(parameter.variable())
            .bind(parameter.units())
            .bind(parameter.is_core())
            .execute(pool)
            .await?;
    }

    Ok(())
}
