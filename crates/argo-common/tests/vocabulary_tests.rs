//! Tests for the shared ARGO vocabularies and record helpers.

use argo_common::{
    ExtractedRecord, Parameter, ProfileGrades, ProfileRecord, QcFlag, RawLevel, RawPosition,
    RawQc, RawValue,
};
use argo_common::{DataFamily, DataMode, Direction};

// ============================================================================
// QC flags
// ============================================================================

#[test]
fn test_every_persisted_flag_has_distinct_code() {
    let mut codes: Vec<&str> = QcFlag::ALL.iter().map(|f| f.as_str()).collect();
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), QcFlag::ALL.len());
}

#[test]
fn test_unknown_flag_never_reports_as_known_code() {
    for byte in [b'6', b'7', b'A', b'?'] {
        let flag = QcFlag::from_raw(RawQc(byte));
        assert!(flag.is_unknown());
        assert_eq!(flag.canonical(), QcFlag::Bad);
    }
}

#[test]
fn test_qc_flag_serializes() {
    let json = serde_json::to_string(&QcFlag::ProbablyGood).unwrap();
    assert_eq!(json, "\"ProbablyGood\"");
}

// ============================================================================
// Parameter catalog
// ============================================================================

#[test]
fn test_core_parameters_lead_catalog() {
    let core: Vec<Parameter> = Parameter::ALL.into_iter().filter(|p| p.is_core()).collect();
    assert_eq!(core, vec![Parameter::Pres, Parameter::Temp, Parameter::Psal]);
    assert_eq!(&Parameter::ALL[..3], core.as_slice());
}

// ============================================================================
// Record accessors
// ============================================================================

#[test]
fn test_extracted_record_accessors() {
    let level = RawLevel {
        samples: vec![(
            Parameter::Pres,
            RawValue {
                value: Some(5.0),
                qc: RawQc(b'1'),
                ..Default::default()
            },
        )],
    };
    let record = ExtractedRecord::Profile(ProfileRecord {
        source_file: "R5904471_012.nc".to_string(),
        platform_number: "5904471".to_string(),
        cycle_number: 12,
        family: DataFamily::Core,
        direction: Direction::Ascending,
        data_mode: Some(DataMode::RealTime),
        juld: None,
        juld_qc: RawQc::BLANK,
        position: RawPosition::default(),
        vertical_sampling_scheme: None,
        config_mission_number: None,
        grades: ProfileGrades::default(),
        levels: vec![level.clone()],
    });

    assert_eq!(record.platform_number(), "5904471");
    assert_eq!(record.source_file(), "R5904471_012.nc");
    assert_eq!(level.sample(Parameter::Pres).and_then(|v| v.value), Some(5.0));
    assert!(level.sample(Parameter::Temp).is_none());
}
