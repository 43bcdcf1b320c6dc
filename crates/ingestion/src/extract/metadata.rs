//! Float metadata (`*_meta.nc`) extraction.

use argo_common::{
    FloatMetadata, LaunchConfigEntry, MissionConfigEntry, ParameterInfo, RawPosition, SensorInfo,
};
use netcdf_parser::Document;

use super::fields::{integer, number_at, string_at, Fields};
use super::history::history;
use crate::error::{IngestionError, Result};

pub fn extract_metadata(doc: &Document, source_file: &str) -> Result<FloatMetadata> {
    let f = Fields::new(doc);

    f.require("PLATFORM_NUMBER")?;
    let platform_number = f
        .text("PLATFORM_NUMBER")?
        .ok_or_else(|| IngestionError::malformed(source_file, "empty PLATFORM_NUMBER"))?;

    let launch_position = RawPosition {
        latitude: f.scalar("LAUNCH_LATITUDE")?,
        longitude: f.scalar("LAUNCH_LONGITUDE")?,
        qc: f.scalar_code("LAUNCH_QC")?,
    };

    Ok(FloatMetadata {
        source_file: source_file.to_string(),
        project_name: f.text("PROJECT_NAME")?,
        pi_name: f.text("PI_NAME")?,
        data_centre: f.text("DATA_CENTRE")?,
        platform_type: f.text("PLATFORM_TYPE")?,
        platform_maker: f.text("PLATFORM_MAKER")?,
        float_serial_no: f.text("FLOAT_SERIAL_NO")?,
        firmware_version: f.text("FIRMWARE_VERSION")?,
        wmo_inst_type: f.text("WMO_INST_TYPE")?,
        positioning_system: f.text("POSITIONING_SYSTEM")?,
        launch_date: f.date("LAUNCH_DATE")?,
        launch_position,
        start_date: f.date("START_DATE")?,
        end_mission_date: f.date("END_MISSION_DATE")?,
        end_mission_status: f.text("END_MISSION_STATUS")?,
        date_update: f.date("DATE_UPDATE")?,
        sensors: sensors(&f)?,
        parameters: parameters(&f)?,
        launch_config: launch_config(&f)?,
        mission_config: mission_config(&f)?,
        history: history(&f)?,
        platform_number,
    })
}

fn sensors(f: &Fields<'_>) -> Result<Vec<SensorInfo>> {
    let Some(n) = f.optional_dimension("N_SENSOR") else {
        return Ok(Vec::new());
    };
    let Some(names) = f.strings("SENSOR", n)? else {
        return Ok(Vec::new());
    };
    let makers = f.strings("SENSOR_MAKER", n)?;
    let models = f.strings("SENSOR_MODEL", n)?;
    let serials = f.strings("SENSOR_SERIAL_NO", n)?;

    Ok(names
        .into_iter()
        .enumerate()
        .filter(|(_, name)| !name.is_empty())
        .map(|(i, sensor)| SensorInfo {
            sensor,
            maker: string_at(&makers, i),
            model: string_at(&models, i),
            serial_no: string_at(&serials, i),
        })
        .collect())
}

fn parameters(f: &Fields<'_>) -> Result<Vec<ParameterInfo>> {
    let Some(n) = f.optional_dimension("N_PARAM") else {
        return Ok(Vec::new());
    };
    let Some(names) = f.strings("PARAMETER", n)? else {
        return Ok(Vec::new());
    };
    let sensors = f.strings("PARAMETER_SENSOR", n)?;
    let units = f.strings("PARAMETER_UNITS", n)?;
    let accuracy = f.strings("PARAMETER_ACCURACY", n)?;
    let resolution = f.strings("PARAMETER_RESOLUTION", n)?;
    let equations = f.strings("PREDEPLOYMENT_CALIB_EQUATION", n)?;
    let coefficients = f.strings("PREDEPLOYMENT_CALIB_COEFFICIENT", n)?;
    let comments = f.strings("PREDEPLOYMENT_CALIB_COMMENT", n)?;

    Ok(names
        .into_iter()
        .enumerate()
        .filter(|(_, name)| !name.is_empty())
        .map(|(i, parameter)| ParameterInfo {
            parameter,
            sensor: string_at(&sensors, i),
            units: string_at(&units, i),
            accuracy: string_at(&accuracy, i),
            resolution: string_at(&resolution, i),
            calibration_equation: string_at(&equations, i),
            calibration_coefficient: string_at(&coefficients, i),
            calibration_comment: string_at(&comments, i),
        })
        .collect())
}

fn launch_config(f: &Fields<'_>) -> Result<Vec<LaunchConfigEntry>> {
    let Some(n) = f.optional_dimension("N_LAUNCH_CONFIG_PARAM") else {
        return Ok(Vec::new());
    };
    let Some(names) = f.strings("LAUNCH_CONFIG_PARAMETER_NAME", n)? else {
        return Ok(Vec::new());
    };
    let values = f.numbers("LAUNCH_CONFIG_PARAMETER_VALUE", n)?;

    Ok(names
        .into_iter()
        .enumerate()
        .filter(|(_, name)| !name.is_empty())
        .map(|(i, name)| LaunchConfigEntry {
            name,
            value: number_at(&values, i),
        })
        .collect())
}

/// `CONFIG_PARAMETER_VALUE` is laid out `[N_MISSIONS, N_CONFIG_PARAM]`.
/// A parameter left at fill for a mission was not configured for it and
/// yields no entry.
fn mission_config(f: &Fields<'_>) -> Result<Vec<MissionConfigEntry>> {
    let (Some(n_params), Some(n_missions)) = (
        f.optional_dimension("N_CONFIG_PARAM"),
        f.optional_dimension("N_MISSIONS"),
    ) else {
        return Ok(Vec::new());
    };
    let Some(names) = f.strings("CONFIG_PARAMETER_NAME", n_params)? else {
        return Ok(Vec::new());
    };
    let Some(values) = f.numbers("CONFIG_PARAMETER_VALUE", n_missions * n_params)? else {
        return Ok(Vec::new());
    };
    let missions = f.numbers("CONFIG_MISSION_NUMBER", n_missions)?;
    let comments = f.strings("CONFIG_MISSION_COMMENT", n_missions)?;

    let mut entries = Vec::new();
    for m in 0..n_missions {
        let mission_number = integer(number_at(&missions, m));
        let mission_comment = string_at(&comments, m);
        for (p, name) in names.iter().enumerate() {
            let Some(value) = values[m * n_params + p] else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            entries.push(MissionConfigEntry {
                mission_number,
                mission_comment: mission_comment.clone(),
                name: name.clone(),
                value,
            });
        }
    }
    Ok(entries)
}
