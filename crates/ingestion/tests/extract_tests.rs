//! Extractor tests against GDAC-shaped fixture documents.

use chrono::{TimeZone, Utc};

use argo_common::{DataFamily, DataMode, Direction, ExtractedRecord, FileCategory, Parameter};
use ingestion::{
    detect_category, extract, extract_metadata, extract_profiles, extract_trajectory,
    IngestionError,
};
use test_utils::{
    assert_approx_eq, meta_document, profile_document, DocumentBuilder, ProfileFixture,
    TrajectoryFixture, REFERENCE_FLOAT,
};

#[test]
fn test_metadata_fields() {
    let doc = meta_document(REFERENCE_FLOAT);
    let meta = extract_metadata(&doc, "5904471_meta.nc").unwrap();

    assert_eq!(meta.platform_number, "5904471");
    assert_eq!(meta.project_name.as_deref(), Some("Argo India"));
    assert_eq!(meta.platform_type.as_deref(), Some("ARVOR"));
    assert_eq!(meta.wmo_inst_type.as_deref(), Some("844"));
    assert_eq!(
        meta.launch_date,
        Some(Utc.with_ymd_and_hms(2019, 7, 2, 6, 30, 0).unwrap())
    );
    assert_eq!(meta.launch_position.latitude, Some(12.5));
    assert_eq!(meta.end_mission_date, None);
}

#[test]
fn test_metadata_auxiliary_tables() {
    let doc = meta_document(REFERENCE_FLOAT);
    let meta = extract_metadata(&doc, "5904471_meta.nc").unwrap();

    assert_eq!(meta.sensors.len(), 3);
    assert_eq!(meta.sensors[0].sensor, "CTD_PRES");
    assert_eq!(meta.sensors[0].model.as_deref(), Some("SBE41CP"));
    assert_eq!(meta.sensors[2].serial_no, None);

    assert_eq!(meta.parameters.len(), 3);
    assert_eq!(meta.parameters[1].units.as_deref(), Some("degree_Celsius"));
    assert_eq!(meta.parameters[1].resolution, None);

    assert_eq!(meta.launch_config.len(), 2);
    assert_eq!(meta.launch_config[1].name, "CONFIG_ParkPressure_dbar");
    assert_eq!(meta.launch_config[1].value, Some(1000.0));

    // Mission 2 leaves its park pressure unset.
    let missions: Vec<(Option<i64>, &str, f64)> = meta
        .mission_config
        .iter()
        .map(|c| (c.mission_number, c.name.as_str(), c.value))
        .collect();
    assert_eq!(
        missions,
        vec![
            (Some(1), "CONFIG_CycleTime_hours", 240.0),
            (Some(1), "CONFIG_ParkPressure_dbar", 1000.0),
            (Some(2), "CONFIG_CycleTime_hours", 120.0),
        ]
    );
    assert_eq!(
        meta.mission_config[2].mission_comment.as_deref(),
        Some("Short cycles after recovery")
    );
    assert!(meta.history.is_empty());
}

#[test]
fn test_bgc_profile_family() {
    let core = ProfileFixture::new(REFERENCE_FLOAT, 12);
    let core_profiles = extract_profiles(&core.document(), "R5904471_012.nc").unwrap();
    assert_eq!(core_profiles[0].family, DataFamily::Core);

    let doc = core.bgc_document(&[210.0, 209.5, 180.2, 120.7, 60.3]);
    let profiles = extract_profiles(&doc, "BR5904471_012.nc").unwrap();
    let p = &profiles[0];
    assert_eq!(p.family, DataFamily::Bgc);
    assert_eq!(p.levels.len(), 5);
    assert!(p.levels[0].sample(Parameter::Temp).is_none());
    assert_eq!(p.levels[1].sample(Parameter::Doxy).unwrap().value, Some(209.5));
}

#[test]
fn test_reference_profile() {
    let doc = ProfileFixture::new(REFERENCE_FLOAT, 12).document();
    let profiles = extract_profiles(&doc, "R5904471_012.nc").unwrap();

    assert_eq!(profiles.len(), 1);
    let p = &profiles[0];
    assert_eq!(p.platform_number, "5904471");
    assert_eq!(p.cycle_number, 12);
    assert_eq!(p.direction, Direction::Ascending);
    assert_eq!(p.data_mode, Some(DataMode::RealTime));
    assert_eq!(p.juld, Some(Utc.with_ymd_and_hms(2020, 3, 14, 12, 0, 0).unwrap()));
    assert_eq!(p.grades.temp, Some('A'));
    assert_eq!(p.levels.len(), 5);

    let surface = p.levels[0].sample(Parameter::Temp).unwrap();
    assert_approx_eq!(surface.value.unwrap(), 28.1, 1e-9);
    assert_eq!(surface.qc.0, b'1');
    assert_eq!(surface.adjusted, None);
    assert!(surface.adjusted_qc.is_blank());
}

#[test]
fn test_fill_levels_are_not_zeros() {
    let long = ProfileFixture::new(REFERENCE_FLOAT, 12);
    let short = ProfileFixture::new(REFERENCE_FLOAT, 13).with_levels(&[4.0, 8.0], &[28.3, 28.2], &[34.0, 34.1]);
    let doc = profile_document("5904471_prof.nc", &[long, short]);

    let profiles = extract_profiles(&doc, "5904471_prof.nc").unwrap();
    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[0].levels.len(), 5);
    // Padding rows carry no pressure and are dropped, not read as 0 dbar.
    assert_eq!(profiles[1].levels.len(), 2);
}

#[test]
fn test_duplicate_cycle_in_one_file() {
    let primary = ProfileFixture::new(REFERENCE_FLOAT, 12);
    let secondary = ProfileFixture::new(REFERENCE_FLOAT, 12).with_scheme("Secondary sampling: discrete");
    let doc = profile_document("5904471_prof.nc", &[primary, secondary]);

    let profiles = extract_profiles(&doc, "5904471_prof.nc").unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(
        profiles[0].vertical_sampling_scheme.as_deref(),
        Some("Primary sampling: averaged")
    );
}

#[test]
fn test_missing_pressure_is_schema_mismatch() {
    let doc = DocumentBuilder::new("R5904471_012.nc")
        .dim("N_PROF", 1)
        .dim("N_LEVELS", 2)
        .dim("STRING8", 8)
        .text("PLATFORM_NUMBER", &["N_PROF", "STRING8"], &["5904471"])
        .ints("CYCLE_NUMBER", &["N_PROF"], &[12])
        .doubles("TEMP", &["N_PROF", "N_LEVELS"], &[28.1, 28.0])
        .build();

    let err = extract_profiles(&doc, "R5904471_012.nc").unwrap_err();
    assert!(matches!(err, IngestionError::SchemaMismatch(ref m) if m.contains("PRES")));
}

#[test]
fn test_missing_levels_dimension_is_schema_mismatch() {
    let doc = DocumentBuilder::new("R5904471_012.nc").dim("N_PROF", 1).build();
    let err = extract_profiles(&doc, "R5904471_012.nc").unwrap_err();
    assert!(matches!(err, IngestionError::SchemaMismatch(ref m) if m.contains("N_LEVELS")));
}

#[test]
fn test_fill_cycle_number_is_malformed() {
    let doc = DocumentBuilder::new("R5904471_012.nc")
        .dim("N_PROF", 1)
        .dim("N_LEVELS", 1)
        .dim("STRING8", 8)
        .text("PLATFORM_NUMBER", &["N_PROF", "STRING8"], &["5904471"])
        .ints("CYCLE_NUMBER", &["N_PROF"], &[99999])
        .doubles("PRES", &["N_PROF", "N_LEVELS"], &[5.0])
        .build();

    let err = extract_profiles(&doc, "R5904471_012.nc").unwrap_err();
    assert!(matches!(err, IngestionError::MalformedRecord { .. }));
}

#[test]
fn test_trajectory_points_sorted_and_filtered() {
    let doc = TrajectoryFixture::new(REFERENCE_FLOAT).document();
    let traj = extract_trajectory(&doc, "5904471_Rtraj.nc").unwrap();

    assert_eq!(traj.platform_number, "5904471");
    assert_eq!(traj.points.len(), 3);
    assert!(traj.points.windows(2).all(|w| w[0].juld < w[1].juld));
    assert_eq!(traj.points[0].cycle_number, Some(11));
    assert_eq!(traj.points[0].measurement_code, Some(703));

    assert_eq!(traj.cycles.len(), 2);
    assert_eq!(traj.cycles[1].cycle_number, 12);
    assert_eq!(
        traj.cycles[1].ascent_end,
        Some(Utc.with_ymd_and_hms(2020, 3, 14, 12, 0, 0).unwrap())
    );
    assert_eq!(traj.cycles[1].park_start, None);
    assert_eq!(traj.cycles[0].grounded, Some('N'));
}

#[test]
fn test_trajectory_in_water_samples() {
    let doc = TrajectoryFixture::new(REFERENCE_FLOAT).document();
    let traj = extract_trajectory(&doc, "5904471_Rtraj.nc").unwrap();

    assert_eq!(traj.family, DataFamily::Core);
    assert_eq!(traj.measurements.len(), 2);
    let park = &traj.measurements[0];
    assert_eq!(park.measurement_index, 4);
    assert_eq!(park.cycle_number, 12);
    assert_eq!(park.measurement_code, Some(290));
    assert_eq!(
        park.juld,
        Some(Utc.with_ymd_and_hms(2020, 3, 9, 12, 0, 0).unwrap())
    );
    let parameters: Vec<Parameter> = park.samples.iter().map(|(p, _)| *p).collect();
    assert_eq!(parameters, vec![Parameter::Pres, Parameter::Temp, Parameter::Psal]);
    assert_eq!(park.samples[1].1.value, Some(6.12));
    assert_eq!(traj.measurements[1].measurement_code, Some(301));
}

#[test]
fn test_trajectory_history() {
    let doc = TrajectoryFixture::new(REFERENCE_FLOAT).document();
    let traj = extract_trajectory(&doc, "5904471_Rtraj.nc").unwrap();

    assert_eq!(traj.history.len(), 2);
    assert_eq!(traj.history[0].institution.as_deref(), Some("IF"));
    assert_eq!(traj.history[0].step.as_deref(), Some("ARFM"));
    assert_eq!(traj.history[0].action, None);
    assert_eq!(traj.history[1].action.as_deref(), Some("QCP$"));
    assert_eq!(
        traj.history[1].date,
        Some(Utc.with_ymd_and_hms(2020, 3, 15, 2, 5, 0).unwrap())
    );
    assert_eq!(traj.history[0].start_pres, None);

    let bare = TrajectoryFixture::new(REFERENCE_FLOAT).without_history().document();
    assert!(extract_trajectory(&bare, "5904471_Rtraj.nc").unwrap().history.is_empty());
}

#[test]
fn test_trajectory_duplicate_timestamps_keep_first() {
    let mut fixture = TrajectoryFixture::new(REFERENCE_FLOAT);
    fixture.points = vec![(25_640.6, 12.51, 87.30, 12), (25_640.6, 12.99, 87.99, 12)];
    let traj = extract_trajectory(&fixture.document(), "5904471_Rtraj.nc").unwrap();

    assert_eq!(traj.points.len(), 1);
    assert_eq!(traj.points[0].latitude, 12.51);
}

#[test]
fn test_extract_dispatches_on_category() {
    let docs = [
        meta_document(REFERENCE_FLOAT),
        ProfileFixture::new(REFERENCE_FLOAT, 12).document(),
        TrajectoryFixture::new(REFERENCE_FLOAT).document(),
    ];
    let categories: Vec<FileCategory> = docs.iter().map(|d| detect_category(d).unwrap()).collect();
    assert_eq!(
        categories,
        vec![FileCategory::Metadata, FileCategory::Profile, FileCategory::Trajectory]
    );

    let records = extract(&docs[1], categories[1]).unwrap();
    assert!(matches!(records.as_slice(), [ExtractedRecord::Profile(_)]));
    assert_eq!(records[0].source_file(), "R5904471_012.nc");
}
