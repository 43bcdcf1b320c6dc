//! End-to-end ingestion against an in-memory catalog.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use ingestion::{FileOutcome, IngestOptions, IngestStage, Ingester};
use netcdf_parser::{Document, DocumentReader, NetCdfResult};
use storage::{Catalog, CatalogOptions, TableCounts};
use tokio_test::assert_ok;
use test_utils::{
    assert_approx_eq, meta_document, temp_test_dir, FixtureReader, ProfileFixture,
    TrajectoryFixture, REFERENCE_FLOAT,
};

async fn ingester(reader: impl DocumentReader + 'static, options: IngestOptions) -> Ingester {
    let catalog = Catalog::open_memory().await.unwrap();
    Ingester::new(Arc::new(reader), catalog, options)
}

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

#[tokio::test]
async fn test_reference_cycle() {
    let reader = FixtureReader::new()
        .with(meta_document(REFERENCE_FLOAT))
        .with(ProfileFixture::new(REFERENCE_FLOAT, 12).document());
    let ingester = ingester(reader, IngestOptions::default().with_max_concurrent_files(1)).await;

    let report = ingester
        .ingest_batch(
            paths(&["5904471_meta.nc", "R5904471_012.nc"]),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(report.committed(), 2, "{:?}", report.failures().collect::<Vec<_>>());

    let snapshot = ingester.catalog().snapshot();
    let float = snapshot.float("5904471").await.unwrap().unwrap();
    assert_eq!(float.project_name.as_deref(), Some("Argo India"));
    assert_eq!(float.launch_qc, "1");

    let cycles = snapshot.cycles("5904471").await.unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].cycle_id, "5904471_012");
    assert_eq!(cycles[0].data_mode.as_deref(), Some("R"));
    assert_eq!(
        cycles[0].juld,
        Some(Utc.with_ymd_and_hms(2020, 3, 14, 12, 0, 0).unwrap())
    );

    let levels = snapshot.levels("5904471_012").await.unwrap();
    let pressures: Vec<f64> = levels.iter().map(|l| l.pressure).collect();
    assert_eq!(pressures, vec![5.0, 10.0, 50.0, 100.0, 200.0]);

    let measurements = snapshot.measurements("5904471_012").await.unwrap();
    let surface_temp = measurements
        .iter()
        .find(|m| m.level_index == 0 && m.parameter == "TEMP")
        .unwrap();
    assert_approx_eq!(surface_temp.value.unwrap(), 28.1, 1e-9);
    assert_eq!(surface_temp.qc, "1");
    assert_eq!(surface_temp.value_source, "raw");
}

#[tokio::test]
async fn test_reingest_is_idempotent() {
    let reader = FixtureReader::new()
        .with(meta_document(REFERENCE_FLOAT))
        .with(ProfileFixture::new(REFERENCE_FLOAT, 12).document())
        .with(TrajectoryFixture::new(REFERENCE_FLOAT).document());
    let ingester = ingester(reader, IngestOptions::default().with_max_concurrent_files(1)).await;
    let files = paths(&["5904471_meta.nc", "R5904471_012.nc", "5904471_Rtraj.nc"]);
    let cancel = CancellationToken::new();

    let first = ingester.ingest_batch(files.clone(), &cancel).await;
    assert!(!first.has_failures());
    let counts = ingester.catalog().snapshot().table_counts().await.unwrap();
    assert_eq!(counts.mission_config, 3);
    assert_eq!(counts.float_history, 2);
    assert_eq!(counts.trajectory_measurements, 6);

    let second = ingester.ingest_batch(files, &cancel).await;
    assert!(!second.has_failures());
    assert!(!second.totals().changed_rows());
    assert_eq!(second.totals().trajectory_points_existing, 3);
    assert_eq!(
        ingester.catalog().snapshot().table_counts().await.unwrap(),
        counts
    );
}

#[tokio::test]
async fn test_core_and_bgc_files_of_one_cycle_coexist() {
    let core = ProfileFixture::new(REFERENCE_FLOAT, 12);
    let reader = FixtureReader::new()
        .with(meta_document(REFERENCE_FLOAT))
        .with(core.document())
        .with(core.bgc_document(&[210.0, 209.5, 180.2, 120.7, 60.3]));
    let ingester = ingester(reader, IngestOptions::default().with_max_concurrent_files(1)).await;
    let cancel = CancellationToken::new();

    let first = ingester
        .ingest_batch(
            paths(&["5904471_meta.nc", "R5904471_012.nc", "BR5904471_012.nc"]),
            &cancel,
        )
        .await;
    assert_eq!(first.committed(), 3, "{:?}", first.failures().collect::<Vec<_>>());

    let snapshot = ingester.catalog().snapshot();
    let count_rows = |rows: &[storage::MeasurementRow], family: &str, parameter: &str| {
        rows.iter()
            .filter(|m| m.family == family && m.parameter == parameter)
            .count()
    };
    let measurements = snapshot.measurements("5904471_012").await.unwrap();
    assert_eq!(count_rows(&measurements, "core", "TEMP"), 5);
    assert_eq!(count_rows(&measurements, "core", "PSAL"), 5);
    assert_eq!(count_rows(&measurements, "bgc", "DOXY"), 5);
    assert_eq!(snapshot.levels("5904471_012").await.unwrap().len(), 10);

    let cycles = snapshot.cycles("5904471").await.unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].family, "core");
    assert_eq!(cycles[0].source_file, "R5904471_012.nc");

    // Re-running the pair changes nothing and loses nothing.
    let counts = snapshot.table_counts().await.unwrap();
    let again = ingester
        .ingest_batch(paths(&["R5904471_012.nc", "BR5904471_012.nc"]), &cancel)
        .await;
    assert!(!again.has_failures());
    assert!(!again.totals().changed_rows());
    assert_eq!(snapshot.table_counts().await.unwrap(), counts);
    let measurements = snapshot.measurements("5904471_012").await.unwrap();
    assert_eq!(count_rows(&measurements, "core", "TEMP"), 5);
}

#[tokio::test]
async fn test_orphan_profile_is_rejected() {
    let reader = FixtureReader::new().with(ProfileFixture::new("9999999", 1).document());
    let ingester = ingester(reader, IngestOptions::default()).await;

    let report = ingester.ingest_file(Path::new("R9999999_001.nc")).await;
    match &report.outcome {
        FileOutcome::Failed { stage, error } => {
            assert_eq!(*stage, IngestStage::Normalized);
            assert_eq!(error.kind(), "referential_integrity");
        }
        other => panic!("expected failure, got {other:?}"),
    }

    let counts = ingester.catalog().snapshot().table_counts().await.unwrap();
    assert_eq!(counts.cycles, 0);
    assert_eq!(counts.floats, 0);
}

#[tokio::test]
async fn test_failures_are_isolated_and_ordered() {
    let reader = FixtureReader::new()
        .with(meta_document(REFERENCE_FLOAT))
        .with(ProfileFixture::new(REFERENCE_FLOAT, 12).document())
        .with(ProfileFixture::new("9999999", 1).document())
        .with(ProfileFixture::new(REFERENCE_FLOAT, 13).document());
    let ingester = ingester(reader, IngestOptions::default().with_max_concurrent_files(1)).await;
    let cancel = CancellationToken::new();

    let meta = ingester.ingest_batch(paths(&["5904471_meta.nc"]), &cancel).await;
    assert_eq!(meta.committed(), 1);

    let files = paths(&[
        "R5904471_012.nc",
        "missing_prof.nc",
        "R9999999_001.nc",
        "R5904471_013.nc",
    ]);
    let report = ingester.ingest_batch(files.clone(), &cancel).await;

    let reported: Vec<&Path> = report.files.iter().map(|f| f.path()).collect();
    assert_eq!(reported, files.iter().map(PathBuf::as_path).collect::<Vec<_>>());
    assert_eq!(report.committed(), 2);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.files[1].error().unwrap().kind(), "unreadable_file");
    assert_eq!(report.files[2].error().unwrap().kind(), "referential_integrity");

    let cycles = ingester.catalog().snapshot().cycles("5904471").await.unwrap();
    let numbers: Vec<i64> = cycles.iter().map(|c| c.cycle_number).collect();
    assert_eq!(numbers, vec![12, 13]);
}

#[tokio::test]
async fn test_concurrent_files_for_one_float() {
    let mut reader = FixtureReader::new().with(meta_document(REFERENCE_FLOAT));
    let mut files = Vec::new();
    for cycle in 1..=12 {
        files.push(reader.insert(ProfileFixture::new(REFERENCE_FLOAT, cycle).document()));
    }
    let ingester = ingester(reader, IngestOptions::default().with_max_concurrent_files(4)).await;
    let cancel = CancellationToken::new();

    ingester.ingest_batch(paths(&["5904471_meta.nc"]), &cancel).await;
    let report = ingester.ingest_batch(files, &cancel).await;

    assert_eq!(report.committed(), 12);
    let counts = ingester.catalog().snapshot().table_counts().await.unwrap();
    assert_eq!(counts.cycles, 12);
    assert_eq!(counts.levels, 60);
}

#[tokio::test]
async fn test_bad_values_keep_raw_but_no_value() {
    let profile = ProfileFixture::new(REFERENCE_FLOAT, 12).with_temp_qc("11411");
    let reader = FixtureReader::new()
        .with(meta_document(REFERENCE_FLOAT))
        .with(profile.document());
    let ingester = ingester(reader, IngestOptions::default().with_max_concurrent_files(1)).await;

    let report = ingester
        .ingest_batch(
            paths(&["5904471_meta.nc", "R5904471_012.nc"]),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(report.files[1].qc.discarded, 1);

    let measurements = ingester
        .catalog()
        .snapshot()
        .measurements("5904471_012")
        .await
        .unwrap();
    let flagged = measurements
        .iter()
        .find(|m| m.level_index == 2 && m.parameter == "TEMP")
        .unwrap();
    assert_eq!(flagged.value, None);
    assert_eq!(flagged.qc, "4");
    assert_eq!(flagged.raw_value, Some(25.3));
}

#[tokio::test]
async fn test_no_fill_value_is_ever_stored() {
    let short = ProfileFixture::new(REFERENCE_FLOAT, 13).with_levels(&[5.0], &[28.0], &[34.0]);
    let doc = test_utils::profile_document(
        "5904471_prof.nc",
        &[ProfileFixture::new(REFERENCE_FLOAT, 12), short],
    );
    let reader = FixtureReader::new().with(meta_document(REFERENCE_FLOAT)).with(doc);
    let ingester = ingester(reader, IngestOptions::default().with_max_concurrent_files(1)).await;

    let report = ingester
        .ingest_batch(
            paths(&["5904471_meta.nc", "5904471_prof.nc"]),
            &CancellationToken::new(),
        )
        .await;
    assert!(!report.has_failures());

    let all = ingester.catalog().snapshot().all_measurements().await.unwrap();
    assert!(!all.is_empty());
    for m in &all {
        for v in [m.value, m.raw_value, m.adjusted_value].into_iter().flatten() {
            assert!(v.abs() < 99_999.0, "fill stored as data: {m:?}");
        }
        assert!(m.qc_flag().is_ok(), "non-canonical flag stored: {m:?}");
    }
}

#[tokio::test]
async fn test_unknown_flag_is_stored_as_bad() {
    let profile = ProfileFixture::new(REFERENCE_FLOAT, 12).with_psal_qc("1X111");
    let reader = FixtureReader::new()
        .with(meta_document(REFERENCE_FLOAT))
        .with(profile.document());
    let ingester = ingester(reader, IngestOptions::default().with_max_concurrent_files(1)).await;

    let report = ingester
        .ingest_batch(
            paths(&["5904471_meta.nc", "R5904471_012.nc"]),
            &CancellationToken::new(),
        )
        .await;
    assert!(report.files[1].is_committed());
    assert_eq!(report.files[1].qc.unknown_flags, 1);

    let measurements = ingester
        .catalog()
        .snapshot()
        .measurements("5904471_012")
        .await
        .unwrap();
    let flagged = measurements
        .iter()
        .find(|m| m.level_index == 1 && m.parameter == "PSAL")
        .unwrap();
    assert_eq!(flagged.qc, "4");
    assert_eq!(flagged.value, None);
}

#[tokio::test]
async fn test_adjusted_values_supersede_raw() {
    let profile = ProfileFixture::new(REFERENCE_FLOAT, 12)
        .with_adjusted_temp(&[28.08, 27.98, 25.28, 20.18, 14.78], "11111");
    let reader = FixtureReader::new()
        .with(meta_document(REFERENCE_FLOAT))
        .with(profile.document());
    let ingester = ingester(reader, IngestOptions::default().with_max_concurrent_files(1)).await;

    ingester
        .ingest_batch(
            paths(&["5904471_meta.nc", "D5904471_012.nc"]),
            &CancellationToken::new(),
        )
        .await;

    let snapshot = ingester.catalog().snapshot();
    assert_eq!(
        snapshot.cycles("5904471").await.unwrap()[0].data_mode.as_deref(),
        Some("D")
    );
    let measurements = snapshot.measurements("5904471_012").await.unwrap();
    let temp = measurements
        .iter()
        .find(|m| m.level_index == 0 && m.parameter == "TEMP")
        .unwrap();
    assert_eq!(temp.value_source, "adjusted");
    assert_approx_eq!(temp.value.unwrap(), 28.08, 1e-9);
    assert_approx_eq!(temp.raw_value.unwrap(), 28.1, 1e-9);
}

#[tokio::test]
async fn test_trajectory_links_to_cycles() {
    let reader = FixtureReader::new()
        .with(meta_document(REFERENCE_FLOAT))
        .with(ProfileFixture::new(REFERENCE_FLOAT, 12).document())
        .with(TrajectoryFixture::new(REFERENCE_FLOAT).document());
    let ingester = ingester(reader, IngestOptions::default().with_max_concurrent_files(1)).await;

    let report = ingester
        .ingest_batch(
            paths(&["5904471_meta.nc", "5904471_Rtraj.nc", "R5904471_012.nc"]),
            &CancellationToken::new(),
        )
        .await;
    assert!(!report.has_failures());

    let points = ingester.catalog().snapshot().trajectory("5904471").await.unwrap();
    assert_eq!(points.len(), 3);
    assert!(points.windows(2).all(|w| w[0].juld < w[1].juld));
    assert_eq!(points[0].cycle_id, None);
    assert_eq!(points[1].cycle_id.as_deref(), Some("5904471_012"));
    assert_eq!(points[2].cycle_id.as_deref(), Some("5904471_012"));
}

#[tokio::test]
async fn test_profile_before_metadata_is_rejected() {
    let reader = FixtureReader::new()
        .with(meta_document(REFERENCE_FLOAT))
        .with(ProfileFixture::new(REFERENCE_FLOAT, 12).document());
    let ingester = ingester(reader, IngestOptions::default().with_max_concurrent_files(1)).await;

    let report = ingester
        .ingest_batch(
            paths(&["R5904471_012.nc", "5904471_meta.nc"]),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(report.files[0].error().unwrap().kind(), "referential_integrity");
    assert!(report.files[1].is_committed());
}

#[tokio::test]
async fn test_schema_mismatch_fails_after_open() {
    let doc = test_utils::DocumentBuilder::new("R5904471_012.nc")
        .dim("N_PROF", 1)
        .build();
    let ingester = ingester(FixtureReader::new().with(doc), IngestOptions::default()).await;

    let report = ingester.ingest_file(Path::new("R5904471_012.nc")).await;
    match &report.outcome {
        FileOutcome::Failed { stage, error } => {
            assert_eq!(*stage, IngestStage::Opened);
            assert_eq!(error.kind(), "schema_mismatch");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_read_times_out() {
    let reader = FixtureReader::new()
        .with(meta_document(REFERENCE_FLOAT))
        .with_delay(Duration::from_millis(500));
    let options = IngestOptions::default().with_read_timeout(Duration::from_millis(20));
    let ingester = ingester(reader, options).await;

    let report = ingester.ingest_file(Path::new("5904471_meta.nc")).await;
    match &report.outcome {
        FileOutcome::Failed { stage, error } => {
            assert_eq!(*stage, IngestStage::Pending);
            assert_eq!(error.kind(), "timeout");
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

fn assert_write_timeout(outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Failed { stage, error } => {
            assert_eq!(*stage, IngestStage::Normalized);
            assert_eq!(error.kind(), "timeout");
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_waiting_for_write_gate_times_out() {
    let catalog = Catalog::open_memory().await.unwrap();
    let reader = FixtureReader::new().with(meta_document(REFERENCE_FLOAT));
    let options = IngestOptions::default().with_write_timeout(Duration::from_millis(100));
    let ingester = Ingester::new(Arc::new(reader), catalog.clone(), options);

    let held = catalog.begin().await.unwrap();
    let report = ingester.ingest_file(Path::new("5904471_meta.nc")).await;
    assert_write_timeout(&report.outcome);
    drop(held);

    assert_eq!(
        catalog.snapshot().table_counts().await.unwrap(),
        TableCounts::default()
    );
    let retry = ingester.ingest_file(Path::new("5904471_meta.nc")).await;
    assert!(retry.is_committed());
}

#[tokio::test]
async fn test_locked_database_times_out_and_rolls_back() {
    let dir = temp_test_dir();
    let db = dir.path().join("catalog.db");
    let options = CatalogOptions {
        busy_timeout: Duration::from_secs(10),
        ..Default::default()
    };
    let catalog = assert_ok!(Catalog::open_with(&db, &options).await);
    // A second catalog on the same file stands in for another process.
    let other = assert_ok!(Catalog::open_with(&db, &options).await);

    let reader = FixtureReader::new().with(meta_document(REFERENCE_FLOAT));
    let ingester = Ingester::new(
        Arc::new(reader),
        catalog,
        IngestOptions::default().with_write_timeout(Duration::from_millis(200)),
    );

    let blocker = assert_ok!(other.begin().await);
    let report = ingester.ingest_file(Path::new("5904471_meta.nc")).await;
    assert_write_timeout(&report.outcome);
    assert!(report.elapsed < Duration::from_secs(5), "waited {:?}", report.elapsed);
    assert_ok!(blocker.rollback().await);

    let snapshot = ingester.catalog().snapshot();
    assert_eq!(snapshot.table_counts().await.unwrap(), TableCounts::default());

    let retry = ingester.ingest_file(Path::new("5904471_meta.nc")).await;
    assert!(retry.is_committed(), "{:?}", retry.outcome);
    assert_eq!(snapshot.table_counts().await.unwrap().floats, 1);
}

#[tokio::test]
async fn test_cancelled_batch_skips_everything() {
    let reader = FixtureReader::new().with(meta_document(REFERENCE_FLOAT));
    let ingester = ingester(reader, IngestOptions::default()).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = ingester
        .ingest_batch(paths(&["5904471_meta.nc"]), &cancel)
        .await;
    assert_eq!(report.skipped(), 1);
    assert!(!report.has_failures());
    assert_eq!(
        ingester.catalog().snapshot().table_counts().await.unwrap().floats,
        0
    );
}

/// Cancels the batch as soon as the first file has been read.
struct CancelAfterFirstRead {
    inner: FixtureReader,
    cancel: CancellationToken,
}

impl DocumentReader for CancelAfterFirstRead {
    fn read(&self, path: &Path) -> NetCdfResult<Document> {
        let doc = self.inner.read(path);
        self.cancel.cancel();
        doc
    }
}

#[tokio::test]
async fn test_cancel_stops_scheduling_but_finishes_running_file() {
    let cancel = CancellationToken::new();
    let reader = CancelAfterFirstRead {
        inner: FixtureReader::new()
            .with(meta_document(REFERENCE_FLOAT))
            .with(ProfileFixture::new(REFERENCE_FLOAT, 12).document()),
        cancel: cancel.clone(),
    };
    let ingester = ingester(reader, IngestOptions::default().with_max_concurrent_files(1)).await;

    let report = ingester
        .ingest_batch(paths(&["5904471_meta.nc", "R5904471_012.nc"]), &cancel)
        .await;

    assert!(report.files[0].is_committed());
    assert!(matches!(report.files[1].outcome, FileOutcome::Skipped));
}

#[tokio::test]
async fn test_file_catalog_survives_reopen() {
    let dir = temp_test_dir();
    let db = dir.path().join("argo").join("catalog.db");

    let catalog = assert_ok!(Catalog::open_with(&db, &CatalogOptions::default()).await);
    let reader = FixtureReader::new()
        .with(meta_document(REFERENCE_FLOAT))
        .with(ProfileFixture::new(REFERENCE_FLOAT, 12).document());
    let ingester = Ingester::new(
        Arc::new(reader),
        catalog,
        IngestOptions::default().with_max_concurrent_files(1),
    );
    let report = ingester
        .ingest_batch(
            paths(&["5904471_meta.nc", "R5904471_012.nc"]),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(report.committed(), 2);
    drop(ingester);

    let reopened = assert_ok!(Catalog::open(&db).await);
    let counts = assert_ok!(reopened.snapshot().table_counts().await);
    assert_eq!(counts.floats, 1);
    assert_eq!(counts.cycles, 1);
    assert_eq!(counts.levels, 5);
}
