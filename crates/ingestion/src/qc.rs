//! QC normalization.
//!
//! Maps every raw ARGO flag onto [`QcFlag`] and decides, per value, whether
//! the adjusted or raw reading is authoritative and whether it is usable.
//! Normalization never fails: unrecognized flags become `Bad` and are
//! logged.

use serde::{Deserialize, Serialize};
use tracing::warn;

use argo_common::{
    ExtractedRecord, FloatMetadata, NormalizedLevel, NormalizedMetadata, NormalizedProfile,
    NormalizedRecord, NormalizedTrajectory, Parameter, Position, ProfileRecord, QcFlag, QcValue,
    RawPosition, RawQc, RawValue, TrajectoryMeasurement, TrajectoryPoint, TrajectoryRecord,
    ValueSource,
};

/// Which flags leave a value in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcPolicy {
    /// Discard values flagged probably bad (3).
    pub reject_probably_bad: bool,
}

impl Default for QcPolicy {
    fn default() -> Self {
        Self {
            reject_probably_bad: true,
        }
    }
}

impl QcPolicy {
    pub fn is_usable(&self, flag: QcFlag) -> bool {
        match flag {
            QcFlag::NoQc
            | QcFlag::Good
            | QcFlag::ProbablyGood
            | QcFlag::Changed
            | QcFlag::Interpolated => true,
            QcFlag::ProbablyBad => !self.reject_probably_bad,
            QcFlag::Bad | QcFlag::Missing | QcFlag::Unknown(_) => false,
        }
    }
}

/// Counters accumulated while normalizing one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QcReport {
    pub values: usize,
    pub adjusted_used: usize,
    pub discarded: usize,
    pub unknown_flags: usize,
}

impl QcReport {
    pub fn merge(&mut self, other: &QcReport) {
        self.values += other.values;
        self.adjusted_used += other.adjusted_used;
        self.discarded += other.discarded;
        self.unknown_flags += other.unknown_flags;
    }
}

/// Where a flag came from, for log context.
struct Site<'a> {
    platform: &'a str,
    cycle: Option<i64>,
    field: &'a str,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QcNormalizer {
    policy: QcPolicy,
}

impl QcNormalizer {
    pub fn new(policy: QcPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &QcPolicy {
        &self.policy
    }

    pub fn normalize(&self, record: ExtractedRecord, report: &mut QcReport) -> NormalizedRecord {
        match record {
            ExtractedRecord::Metadata(m) => NormalizedRecord::Metadata(self.metadata(m, report)),
            ExtractedRecord::Profile(p) => NormalizedRecord::Profile(self.profile(p, report)),
            ExtractedRecord::Trajectory(t) => {
                NormalizedRecord::Trajectory(self.trajectory(t, report))
            }
        }
    }

    fn flag(&self, raw: RawQc, site: &Site<'_>, report: &mut QcReport) -> QcFlag {
        let flag = QcFlag::from_raw(raw);
        if flag.is_unknown() {
            report.unknown_flags += 1;
            warn!(
                platform = %site.platform,
                cycle = ?site.cycle,
                field = %site.field,
                code = %char::from(raw.0).escape_default(),
                "Unrecognized QC flag, treating as bad"
            );
        }
        flag.canonical()
    }

    fn position(&self, raw: &RawPosition, site: &Site<'_>, report: &mut QcReport) -> Position {
        let qc = match (raw.latitude, raw.longitude) {
            (Some(lat), Some(lon)) => {
                let flag = self.flag(raw.qc, site, report);
                let in_range = (-90.0..=90.0).contains(&lat) && (-180.0..=360.0).contains(&lon);
                if in_range {
                    flag
                } else {
                    QcFlag::Bad
                }
            }
            _ => QcFlag::Missing,
        };
        Position {
            latitude: raw.latitude,
            longitude: raw.longitude,
            qc,
        }
    }

    fn value(&self, raw: &RawValue, site: &Site<'_>, report: &mut QcReport) -> QcValue {
        report.values += 1;

        let raw_qc = missing_if_absent(raw.value, self.flag(raw.qc, site, report));
        let adjusted_qc =
            (!raw.adjusted_qc.is_blank()).then(|| self.flag(raw.adjusted_qc, site, report));

        let (candidate, candidate_qc, source) = if raw.adjusted.is_some() || adjusted_qc.is_some() {
            let qc = missing_if_absent(raw.adjusted, adjusted_qc.unwrap_or(QcFlag::NoQc));
            (raw.adjusted, qc, ValueSource::Adjusted)
        } else {
            (raw.value, raw_qc, ValueSource::Raw)
        };

        let value = match candidate {
            Some(v) if self.policy.is_usable(candidate_qc) => Some(v),
            Some(_) => {
                report.discarded += 1;
                None
            }
            None => None,
        };
        if value.is_some() && source == ValueSource::Adjusted {
            report.adjusted_used += 1;
        }

        QcValue {
            value,
            qc: candidate_qc,
            source,
            raw: raw.value,
            raw_qc,
            adjusted: raw.adjusted,
            adjusted_qc,
            adjusted_error: raw.adjusted_error,
        }
    }

    fn metadata(&self, metadata: FloatMetadata, report: &mut QcReport) -> NormalizedMetadata {
        let site = Site {
            platform: &metadata.platform_number,
            cycle: None,
            field: "LAUNCH_QC",
        };
        let launch_position = self.position(&metadata.launch_position, &site, report);
        NormalizedMetadata {
            metadata,
            launch_position,
        }
    }

    fn profile(&self, profile: ProfileRecord, report: &mut QcReport) -> NormalizedProfile {
        let site = |field| Site {
            platform: &profile.platform_number,
            cycle: Some(profile.cycle_number),
            field,
        };

        let juld_qc = missing_if_absent(
            profile.juld.as_ref(),
            self.flag(profile.juld_qc, &site("JULD_QC"), report),
        );
        let position = self.position(&profile.position, &site("POSITION_QC"), report);

        let mut levels: Vec<NormalizedLevel> = profile
            .levels
            .iter()
            .filter_map(|level| {
                let pres = level.sample(Parameter::Pres)?;
                let pressure = pres.adjusted.or(pres.value)?;
                let samples = level
                    .samples
                    .iter()
                    .map(|(parameter, raw)| {
                        let value = self.value(raw, &site(parameter.variable()), report);
                        (*parameter, value)
                    })
                    .collect();
                Some(NormalizedLevel { pressure, samples })
            })
            .collect();
        levels.sort_by(|a, b| a.pressure.total_cmp(&b.pressure));

        NormalizedProfile {
            juld_qc,
            position,
            levels,
            source_file: profile.source_file,
            platform_number: profile.platform_number,
            cycle_number: profile.cycle_number,
            family: profile.family,
            direction: profile.direction,
            data_mode: profile.data_mode,
            juld: profile.juld,
            vertical_sampling_scheme: profile.vertical_sampling_scheme,
            config_mission_number: profile.config_mission_number,
            grades: profile.grades,
        }
    }

    fn trajectory(&self, trajectory: TrajectoryRecord, report: &mut QcReport) -> NormalizedTrajectory {
        let points = trajectory
            .points
            .iter()
            .map(|p| {
                let site = |field| Site {
                    platform: &trajectory.platform_number,
                    cycle: p.cycle_number,
                    field,
                };
                TrajectoryPoint {
                    timestamp: p.juld,
                    timestamp_qc: self.flag(p.juld_qc, &site("JULD_QC"), report),
                    latitude: p.latitude,
                    longitude: p.longitude,
                    position_qc: self.flag(p.position_qc, &site("POSITION_QC"), report),
                    cycle_number: p.cycle_number,
                    measurement_code: p.measurement_code,
                }
            })
            .collect();

        let measurements = trajectory
            .measurements
            .iter()
            .map(|m| TrajectoryMeasurement {
                measurement_index: m.measurement_index,
                cycle_number: m.cycle_number,
                measurement_code: m.measurement_code,
                juld: m.juld,
                samples: m
                    .samples
                    .iter()
                    .map(|(parameter, raw)| {
                        let site = Site {
                            platform: &trajectory.platform_number,
                            cycle: Some(m.cycle_number),
                            field: parameter.variable(),
                        };
                        (*parameter, self.value(raw, &site, report))
                    })
                    .collect(),
            })
            .collect();

        NormalizedTrajectory {
            source_file: trajectory.source_file,
            platform_number: trajectory.platform_number,
            family: trajectory.family,
            points,
            cycles: trajectory.cycles,
            measurements,
            history: trajectory.history,
        }
    }
}

/// A flag on an absent value collapses to `Missing` unless it already
/// says the value is bad.
fn missing_if_absent<T>(value: Option<T>, flag: QcFlag) -> QcFlag {
    match (value, flag) {
        (Some(_), flag) => flag,
        (None, QcFlag::Bad | QcFlag::ProbablyBad) => flag,
        (None, _) => QcFlag::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Site<'static> {
        Site {
            platform: "5904471",
            cycle: Some(12),
            field: "TEMP",
        }
    }

    fn raw(value: Option<f64>, qc: char) -> RawValue {
        RawValue {
            value,
            qc: RawQc::from(qc),
            ..Default::default()
        }
    }

    fn normalize(raw: &RawValue) -> (QcValue, QcReport) {
        let mut report = QcReport::default();
        let value = QcNormalizer::default().value(raw, &site(), &mut report);
        (value, report)
    }

    #[test]
    fn test_good_raw_value_passes_through() {
        let (v, report) = normalize(&raw(Some(12.5), '1'));
        assert_eq!(v.value, Some(12.5));
        assert_eq!(v.qc, QcFlag::Good);
        assert_eq!(v.source, ValueSource::Raw);
        assert_eq!(report.discarded, 0);
    }

    #[test]
    fn test_bad_value_is_discarded_but_kept_raw() {
        let (v, report) = normalize(&raw(Some(35.1), '4'));
        assert_eq!(v.value, None);
        assert_eq!(v.qc, QcFlag::Bad);
        assert_eq!(v.raw, Some(35.1));
        assert_eq!(report.discarded, 1);
    }

    #[test]
    fn test_probably_bad_follows_policy() {
        let value = raw(Some(4.0), '3');
        let mut report = QcReport::default();

        let strict = QcNormalizer::default().value(&value, &site(), &mut report);
        assert_eq!(strict.value, None);

        let lenient = QcNormalizer::new(QcPolicy {
            reject_probably_bad: false,
        })
        .value(&value, &site(), &mut report);
        assert_eq!(lenient.value, Some(4.0));
        assert_eq!(lenient.qc, QcFlag::ProbablyBad);
    }

    #[test]
    fn test_adjusted_supersedes_raw() {
        let value = RawValue {
            value: Some(12.50),
            qc: RawQc::from('1'),
            adjusted: Some(12.48),
            adjusted_qc: RawQc::from('1'),
            adjusted_error: Some(0.002),
        };
        let (v, report) = normalize(&value);
        assert_eq!(v.value, Some(12.48));
        assert_eq!(v.source, ValueSource::Adjusted);
        assert_eq!(v.raw, Some(12.50));
        assert_eq!(v.adjusted_error, Some(0.002));
        assert_eq!(report.adjusted_used, 1);
    }

    #[test]
    fn test_bad_adjustment_does_not_fall_back_to_raw() {
        let value = RawValue {
            value: Some(35.0),
            qc: RawQc::from('1'),
            adjusted: None,
            adjusted_qc: RawQc::from('4'),
            adjusted_error: None,
        };
        let (v, _) = normalize(&value);
        assert_eq!(v.value, None);
        assert_eq!(v.qc, QcFlag::Bad);
        assert_eq!(v.source, ValueSource::Adjusted);
    }

    #[test]
    fn test_unknown_flag_becomes_bad() {
        let (v, report) = normalize(&raw(Some(7.0), 'X'));
        assert_eq!(v.qc, QcFlag::Bad);
        assert_eq!(v.value, None);
        assert_eq!(report.unknown_flags, 1);
    }

    #[test]
    fn test_blank_flag_on_missing_value_is_missing() {
        let (v, _) = normalize(&raw(None, ' '));
        assert_eq!(v.qc, QcFlag::Missing);
        let (v, _) = normalize(&raw(Some(1.0), ' '));
        assert_eq!(v.qc, QcFlag::NoQc);
        assert_eq!(v.value, Some(1.0));
    }

    #[test]
    fn test_out_of_range_position_is_bad() {
        let mut report = QcReport::default();
        let position = QcNormalizer::default().position(
            &RawPosition {
                latitude: Some(91.0),
                longitude: Some(10.0),
                qc: RawQc::from('1'),
            },
            &site(),
            &mut report,
        );
        assert_eq!(position.qc, QcFlag::Bad);
    }
}
