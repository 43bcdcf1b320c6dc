//! Ingestion coordinator.
//!
//! Drives each file through open, extract, normalize, map and commit.
//! Files are independent: a failure rolls back that file only and the
//! batch carries on.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use argo_common::{FileCategory, NormalizedRecord};
use netcdf_parser::{Document, DocumentReader};
use storage::{Catalog, MapSummary, StorageError};

use crate::config::IngestOptions;
use crate::detect::detect_category;
use crate::error::{IngestionError, Result};
use crate::extract::extract;
use crate::locks::FloatLocks;
use crate::qc::{QcNormalizer, QcReport};
use crate::report::{BatchReport, FileOutcome, FileReport, IngestStage};

/// State carried through one file's run for its report.
struct Progress {
    stage: IngestStage,
    category: Option<FileCategory>,
    qc: QcReport,
}

/// Core ingester for ARGO files.
pub struct Ingester {
    reader: Arc<dyn DocumentReader>,
    catalog: Catalog,
    normalizer: QcNormalizer,
    locks: FloatLocks,
    options: IngestOptions,
}

impl Ingester {
    pub fn new(reader: Arc<dyn DocumentReader>, catalog: Catalog, options: IngestOptions) -> Self {
        Self {
            reader,
            catalog,
            normalizer: QcNormalizer::new(options.qc_policy),
            locks: FloatLocks::new(),
            options,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Ingest one file. Never panics on bad input; the outcome is in the
    /// report.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn ingest_file(&self, path: &Path) -> FileReport {
        let started = Instant::now();
        let mut progress = Progress {
            stage: IngestStage::Pending,
            category: None,
            qc: QcReport::default(),
        };

        let outcome = match self.run(path, &mut progress).await {
            Ok(summary) => {
                info!(
                    category = ?progress.category,
                    changed = summary.changed_rows(),
                    discarded = progress.qc.discarded,
                    unknown_flags = progress.qc.unknown_flags,
                    "Committed file"
                );
                FileOutcome::Committed(summary)
            }
            Err(e) => {
                error!(
                    stage = %progress.stage,
                    kind = e.kind(),
                    error = %e,
                    "File ingestion failed"
                );
                FileOutcome::Failed {
                    stage: progress.stage,
                    error: e,
                }
            }
        };

        FileReport {
            path: path.to_path_buf(),
            category: progress.category,
            outcome,
            qc: progress.qc,
            elapsed: started.elapsed(),
        }
    }

    async fn run(&self, path: &Path, progress: &mut Progress) -> Result<MapSummary> {
        let doc = self.open(path).await?;
        progress.stage = IngestStage::Opened;

        let category = detect_category(&doc)?;
        progress.category = Some(category);
        let extracted = extract(&doc, category)?;
        drop(doc);
        progress.stage = IngestStage::Extracted;
        debug!(%category, records = extracted.len(), "Extracted records");

        let records: Vec<NormalizedRecord> = extracted
            .into_iter()
            .map(|record| self.normalizer.normalize(record, &mut progress.qc))
            .collect();
        progress.stage = IngestStage::Normalized;

        self.write(&records, progress).await
    }

    /// Load the file on the blocking pool.
    ///
    /// On timeout the read keeps its blocking thread until the library
    /// returns; the file is reported as failed either way.
    async fn open(&self, path: &Path) -> Result<Document> {
        let reader = Arc::clone(&self.reader);
        let owned = path.to_path_buf();
        let read = tokio::task::spawn_blocking(move || reader.read(&owned));

        let after = self.options.read_timeout;
        match tokio::time::timeout(after, read).await {
            Ok(joined) => Ok(joined??),
            Err(_) => Err(IngestionError::Timeout {
                stage: "read",
                after,
            }),
        }
    }

    /// Apply every record in one transaction and commit.
    ///
    /// `write_timeout` bounds everything up to the commit: waiting for the
    /// float locks, the write gate and the database lock, then applying the
    /// records. The commit itself runs with the lock already held.
    async fn write(&self, records: &[NormalizedRecord], progress: &mut Progress) -> Result<MapSummary> {
        let after = self.options.write_timeout;
        let deadline = tokio::time::Instant::now() + after;
        let timed_out = || IngestionError::Timeout {
            stage: "write",
            after,
        };

        // Float locks come before the transaction, so a connection is never
        // held while waiting on another file.
        let acquired = tokio::time::timeout_at(deadline, async {
            let floats = self
                .locks
                .lock_all(records.iter().map(NormalizedRecord::platform_number))
                .await;
            let tx = self.catalog.begin().await?;
            Ok::<_, StorageError>((floats, tx))
        })
        .await;
        let (_floats, mut tx) = match acquired {
            Ok(Ok(held)) => held,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                debug!(?after, "Timed out waiting for the catalog write lock");
                return Err(timed_out());
            }
        };

        let applied = tokio::time::timeout_at(deadline, async {
            for record in records {
                tx.apply(record).await?;
            }
            Ok::<_, StorageError>(())
        })
        .await;

        let failure = match applied {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(IngestionError::from(e)),
            Err(_) => Some(timed_out()),
        };
        if let Some(e) = failure {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "Rollback failed; transaction dropped");
            }
            return Err(e);
        }
        progress.stage = IngestStage::Mapped;

        let summary = tx.commit().await?;
        progress.stage = IngestStage::Committed;
        Ok(summary)
    }

    /// Ingest many files with bounded concurrency.
    ///
    /// Reports come back in input order. Once `cancel` fires, files not yet
    /// started are reported as skipped; files already running finish.
    #[instrument(skip_all, fields(files = paths.len()))]
    pub async fn ingest_batch(&self, paths: Vec<PathBuf>, cancel: &CancellationToken) -> BatchReport {
        let concurrency = self.options.max_concurrent_files.max(1);
        info!(concurrency, "Starting batch");

        let mut reports: Vec<(usize, FileReport)> = stream::iter(paths.into_iter().enumerate())
            .map(|(i, path)| async move {
                let report = if cancel.is_cancelled() {
                    debug!(path = %path.display(), "Batch cancelled, skipping file");
                    FileReport::skipped(path)
                } else {
                    self.ingest_file(&path).await
                };
                (i, report)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;
        reports.sort_by_key(|(i, _)| *i);

        let batch = BatchReport {
            files: reports.into_iter().map(|(_, r)| r).collect(),
        };
        info!(
            committed = batch.committed(),
            failed = batch.failed(),
            skipped = batch.skipped(),
            "Batch finished"
        );
        batch
    }
}
