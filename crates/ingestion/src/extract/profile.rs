//! Profile (`*_prof.nc`, `R*_NNN.nc`) extraction.
//!
//! One [`ProfileRecord`] per `N_PROF` entry. Per-level variables are laid
//! out `[N_PROF, N_LEVELS]`, row-major.

use tracing::warn;

use argo_common::{
    juld_to_datetime, DataFamily, DataMode, Direction, Parameter, ProfileGrades, ProfileRecord,
    RawLevel, RawPosition,
};
use netcdf_parser::Document;

use super::fields::{code_at, integer, number_at, string_at, Fields, ParameterColumns};
use crate::detect::is_bgc_filename;
use crate::error::{IngestionError, Result};

pub fn extract_profiles(doc: &Document, source_file: &str) -> Result<Vec<ProfileRecord>> {
    let f = Fields::new(doc);
    let n_prof = f.dimension("N_PROF")?;
    let n_levels = f.dimension("N_LEVELS")?;
    let cells = n_prof * n_levels;

    f.require("PRES")?;
    let platforms = f.required_strings("PLATFORM_NUMBER", n_prof)?;
    let cycles = f.required_numbers("CYCLE_NUMBER", n_prof)?;
    let directions = f.codes("DIRECTION", n_prof)?;
    let data_modes = f.codes("DATA_MODE", n_prof)?;
    let julds = f.numbers("JULD", n_prof)?;
    let juld_qc = f.codes("JULD_QC", n_prof)?;
    let latitudes = f.numbers("LATITUDE", n_prof)?;
    let longitudes = f.numbers("LONGITUDE", n_prof)?;
    let position_qc = f.codes("POSITION_QC", n_prof)?;
    let schemes = f.strings("VERTICAL_SAMPLING_SCHEME", n_prof)?;
    let missions = f.numbers("CONFIG_MISSION_NUMBER", n_prof)?;
    let pres_grades = f.codes("PROFILE_PRES_QC", n_prof)?;
    let temp_grades = f.codes("PROFILE_TEMP_QC", n_prof)?;
    let psal_grades = f.codes("PROFILE_PSAL_QC", n_prof)?;

    let columns = ParameterColumns::load_all(&f, cells)?;
    let family = if is_bgc_filename(doc.path()) {
        DataFamily::Bgc
    } else {
        DataFamily::of(columns.iter().map(|c| c.parameter))
    };

    let mut records = Vec::with_capacity(n_prof);
    for p in 0..n_prof {
        let label = format!("{source_file} profile {p}");
        let platform_number = platforms[p].clone();
        if platform_number.is_empty() {
            return Err(IngestionError::malformed(label, "empty PLATFORM_NUMBER"));
        }
        let cycle_number = integer(cycles[p])
            .filter(|c| *c >= 0)
            .ok_or_else(|| IngestionError::malformed(&label, "missing or invalid CYCLE_NUMBER"))?;

        let levels = (0..n_levels)
            .map(|l| p * n_levels + l)
            .map(|i| RawLevel {
                samples: columns.iter().map(|c| (c.parameter, c.value_at(i))).collect(),
            })
            .filter(has_pressure)
            .collect();

        records.push(ProfileRecord {
            source_file: source_file.to_string(),
            platform_number,
            cycle_number,
            family,
            direction: Direction::from_code(code_at(&directions, p).0),
            data_mode: DataMode::from_code(code_at(&data_modes, p).0),
            juld: number_at(&julds, p).and_then(juld_to_datetime),
            juld_qc: code_at(&juld_qc, p),
            position: RawPosition {
                latitude: number_at(&latitudes, p),
                longitude: number_at(&longitudes, p),
                qc: code_at(&position_qc, p),
            },
            vertical_sampling_scheme: string_at(&schemes, p),
            config_mission_number: integer(number_at(&missions, p)),
            grades: ProfileGrades {
                pres: grade(&pres_grades, p),
                temp: grade(&temp_grades, p),
                psal: grade(&psal_grades, p),
            },
            levels,
        });
    }

    Ok(dedupe_cycles(records))
}

fn has_pressure(level: &RawLevel) -> bool {
    level
        .sample(Parameter::Pres)
        .is_some_and(|pres| pres.value.is_some() || pres.adjusted.is_some())
}

fn grade(column: &Option<Vec<u8>>, i: usize) -> Option<char> {
    let code = code_at(column, i);
    (!code.is_blank()).then_some(char::from(code.0))
}

/// Keep one profile per (float, cycle). An ascending profile replaces an
/// earlier descending one; otherwise the first occurrence wins.
fn dedupe_cycles(records: Vec<ProfileRecord>) -> Vec<ProfileRecord> {
    let mut kept: Vec<ProfileRecord> = Vec::with_capacity(records.len());
    for record in records {
        let existing = kept.iter_mut().find(|k| {
            k.platform_number == record.platform_number && k.cycle_number == record.cycle_number
        });
        match existing {
            None => kept.push(record),
            Some(existing) => {
                let replace = existing.direction == Direction::Descending
                    && record.direction == Direction::Ascending;
                warn!(
                    platform = %record.platform_number,
                    cycle = record.cycle_number,
                    kept = if replace { "later ascending" } else { "first" },
                    "Duplicate profile for cycle in one file"
                );
                if replace {
                    *existing = record;
                }
            }
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use argo_common::RawValue;

    fn record(cycle: i64, direction: Direction, scheme: &str) -> ProfileRecord {
        ProfileRecord {
            source_file: "5904471_prof.nc".into(),
            platform_number: "5904471".into(),
            cycle_number: cycle,
            family: DataFamily::Core,
            direction,
            data_mode: None,
            juld: None,
            juld_qc: Default::default(),
            position: Default::default(),
            vertical_sampling_scheme: Some(scheme.into()),
            config_mission_number: None,
            grades: Default::default(),
            levels: Vec::new(),
        }
    }

    #[test]
    fn test_dedupe_keeps_first_ascending() {
        let kept = dedupe_cycles(vec![
            record(12, Direction::Ascending, "Primary"),
            record(12, Direction::Ascending, "Near-surface"),
            record(13, Direction::Ascending, "Primary"),
        ]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].vertical_sampling_scheme.as_deref(), Some("Primary"));
    }

    #[test]
    fn test_dedupe_prefers_ascending() {
        let kept = dedupe_cycles(vec![
            record(1, Direction::Descending, "Descent"),
            record(1, Direction::Ascending, "Primary"),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].direction, Direction::Ascending);
    }

    #[test]
    fn test_levels_without_pressure_are_dropped() {
        let with = RawLevel {
            samples: vec![(
                Parameter::Pres,
                RawValue {
                    value: Some(5.0),
                    ..Default::default()
                },
            )],
        };
        let without = RawLevel {
            samples: vec![(Parameter::Pres, RawValue::default())],
        };
        assert!(has_pressure(&with));
        assert!(!has_pressure(&without));
    }
}
