//! Trajectory (`*_Rtraj.nc`, `*_Dtraj.nc`, `*_BRtraj.nc`) extraction.
//!
//! Located fixes become trajectory points; rows carrying parameter values
//! become in-water measurements. A row may be both.

use chrono::{DateTime, Utc};

use argo_common::{
    juld_to_datetime, DataFamily, DataMode, RawTrajectoryMeasurement, RawTrajectoryPoint,
    TrajectoryCycle, TrajectoryRecord,
};
use netcdf_parser::Document;

use super::fields::{code_at, integer, number_at, Fields, ParameterColumns};
use super::history::history;
use crate::detect::is_bgc_filename;
use crate::error::{IngestionError, Result};

pub fn extract_trajectory(doc: &Document, source_file: &str) -> Result<TrajectoryRecord> {
    let f = Fields::new(doc);
    let n = f.dimension("N_MEASUREMENT")?;

    f.require("PLATFORM_NUMBER")?;
    let platform_number = f
        .text("PLATFORM_NUMBER")?
        .ok_or_else(|| IngestionError::malformed(source_file, "empty PLATFORM_NUMBER"))?;

    let julds = f.required_numbers("JULD", n)?;
    let latitudes = f.required_numbers("LATITUDE", n)?;
    let longitudes = f.required_numbers("LONGITUDE", n)?;
    let juld_qc = f.codes("JULD_QC", n)?;
    let position_qc = f.codes("POSITION_QC", n)?;
    let cycle_numbers = f.numbers("CYCLE_NUMBER", n)?;
    let measurement_codes = f.numbers("MEASUREMENT_CODE", n)?;

    let mut points: Vec<RawTrajectoryPoint> = (0..n)
        .filter_map(|i| {
            let juld = julds[i].and_then(juld_to_datetime)?;
            let latitude = latitudes[i].filter(|v| (-90.0..=90.0).contains(v))?;
            let longitude = longitudes[i].filter(|v| (-180.0..=360.0).contains(v))?;
            Some(RawTrajectoryPoint {
                juld,
                juld_qc: code_at(&juld_qc, i),
                latitude,
                longitude,
                position_qc: code_at(&position_qc, i),
                cycle_number: integer(number_at(&cycle_numbers, i)),
                measurement_code: integer(number_at(&measurement_codes, i)),
            })
        })
        .collect();

    // Stable sort, so the first fix in file order survives a timestamp tie.
    points.sort_by_key(|p| p.juld);
    points.dedup_by_key(|p| p.juld);

    let columns = ParameterColumns::load_all(&f, n)?;
    let family = if is_bgc_filename(doc.path()) {
        DataFamily::Bgc
    } else {
        DataFamily::of(columns.iter().map(|c| c.parameter))
    };

    let measurements = (0..n)
        .filter_map(|i| {
            let cycle_number = integer(number_at(&cycle_numbers, i)).filter(|c| *c >= 0)?;
            let samples: Vec<_> = columns
                .iter()
                .map(|c| (c.parameter, c.value_at(i)))
                .filter(|(_, v)| v.value.is_some() || v.adjusted.is_some())
                .collect();
            if samples.is_empty() {
                return None;
            }
            Some(RawTrajectoryMeasurement {
                measurement_index: i as i64,
                cycle_number,
                measurement_code: integer(number_at(&measurement_codes, i)),
                juld: julds[i].and_then(juld_to_datetime),
                samples,
            })
        })
        .collect();

    Ok(TrajectoryRecord {
        source_file: source_file.to_string(),
        cycles: cycles(&f)?,
        history: history(&f)?,
        platform_number,
        family,
        points,
        measurements,
    })
}

/// Per-cycle timing summaries from the `N_CYCLE` variables.
fn cycles(f: &Fields<'_>) -> Result<Vec<TrajectoryCycle>> {
    let Some(n) = f.optional_dimension("N_CYCLE") else {
        return Ok(Vec::new());
    };
    let Some(indices) = f.numbers("CYCLE_NUMBER_INDEX", n)? else {
        return Ok(Vec::new());
    };

    let time = |name: &str| -> Result<Option<Vec<Option<f64>>>> { f.numbers(name, n) };
    let descent_start = time("JULD_DESCENT_START")?;
    let park_start = time("JULD_PARK_START")?;
    let ascent_start = time("JULD_ASCENT_START")?;
    let ascent_end = time("JULD_ASCENT_END")?;
    let transmission_start = time("JULD_TRANSMISSION_START")?;
    let first_location = time("JULD_FIRST_LOCATION")?;
    let last_location = time("JULD_LAST_LOCATION")?;
    let data_modes = f.codes("DATA_MODE", n)?;
    let grounded = f.codes("GROUNDED", n)?;
    let park_pressure = f.numbers("REPRESENTATIVE_PARK_PRESSURE", n)?;
    let missions = f.numbers("CONFIG_MISSION_NUMBER", n)?;

    let at = |column: &Option<Vec<Option<f64>>>, i: usize| -> Option<DateTime<Utc>> {
        number_at(column, i).and_then(juld_to_datetime)
    };

    let mut cycles: Vec<TrajectoryCycle> = Vec::with_capacity(n);
    for i in 0..n {
        let Some(cycle_number) = integer(indices[i]).filter(|c| *c >= 0) else {
            continue;
        };
        if cycles.iter().any(|c| c.cycle_number == cycle_number) {
            continue;
        }
        let grounded_code = code_at(&grounded, i);
        cycles.push(TrajectoryCycle {
            cycle_number,
            data_mode: DataMode::from_code(code_at(&data_modes, i).0),
            descent_start: at(&descent_start, i),
            park_start: at(&park_start, i),
            ascent_start: at(&ascent_start, i),
            ascent_end: at(&ascent_end, i),
            transmission_start: at(&transmission_start, i),
            first_location: at(&first_location, i),
            last_location: at(&last_location, i),
            grounded: (!grounded_code.is_blank()).then_some(char::from(grounded_code.0)),
            park_pressure: number_at(&park_pressure, i),
            config_mission_number: integer(number_at(&missions, i)),
        });
    }
    cycles.sort_by_key(|c| c.cycle_number);
    Ok(cycles)
}
