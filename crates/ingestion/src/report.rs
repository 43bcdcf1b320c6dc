//! Per-file and per-batch outcomes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use argo_common::FileCategory;
use storage::MapSummary;

use crate::error::IngestionError;
use crate::qc::QcReport;

/// Lifecycle of one file. Each state is reached only after the previous
/// one completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestStage {
    Pending,
    Opened,
    Extracted,
    Normalized,
    Mapped,
    Committed,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Pending => "pending",
            IngestStage::Opened => "opened",
            IngestStage::Extracted => "extracted",
            IngestStage::Normalized => "normalized",
            IngestStage::Mapped => "mapped",
            IngestStage::Committed => "committed",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum FileOutcome {
    Committed(MapSummary),
    /// Nothing from the file was written. `stage` is the last state the
    /// file reached before the error.
    Failed {
        stage: IngestStage,
        error: IngestionError,
    },
    /// Not started because the batch was cancelled.
    Skipped,
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub category: Option<FileCategory>,
    pub outcome: FileOutcome,
    pub qc: QcReport,
    pub elapsed: Duration,
}

impl FileReport {
    pub(crate) fn skipped(path: PathBuf) -> Self {
        Self {
            path,
            category: None,
            outcome: FileOutcome::Skipped,
            qc: QcReport::default(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_committed(&self) -> bool {
        matches!(self.outcome, FileOutcome::Committed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, FileOutcome::Failed { .. })
    }

    pub fn summary(&self) -> Option<&MapSummary> {
        match &self.outcome {
            FileOutcome::Committed(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&IngestionError> {
        match &self.outcome {
            FileOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.display();
        match &self.outcome {
            FileOutcome::Committed(summary) if !summary.changed_rows() => {
                write!(f, "OK      {path}: unchanged")
            }
            FileOutcome::Committed(summary) => write!(
                f,
                "OK      {path}: {} floats, {} cycles, {} levels, {} trajectory points written; \
                 {} values discarded by QC",
                summary.floats_created + summary.floats_updated,
                summary.cycles_created + summary.cycles_updated,
                summary.levels_written,
                summary.trajectory_points_inserted,
                self.qc.discarded
            ),
            FileOutcome::Failed { stage, error } => {
                write!(f, "FAILED  {path} (after {stage}): {error}")
            }
            FileOutcome::Skipped => write!(f, "SKIPPED {path}"),
        }
    }
}

/// Reports for every file of a batch, in submission order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn committed(&self) -> usize {
        self.files.iter().filter(|f| f.is_committed()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| f.is_failed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Skipped))
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.is_failed())
    }

    /// Sum of the map summaries of committed files.
    pub fn totals(&self) -> MapSummary {
        let mut totals = MapSummary::default();
        for summary in self.files.iter().filter_map(FileReport::summary) {
            totals.merge(summary);
        }
        totals
    }

    /// Append another batch's reports.
    pub fn extend(&mut self, other: BatchReport) {
        self.files.extend(other.files);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(path: &str) -> FileReport {
        FileReport {
            path: path.into(),
            category: Some(FileCategory::Profile),
            outcome: FileOutcome::Failed {
                stage: IngestStage::Normalized,
                error: IngestionError::SchemaMismatch("missing variable PRES".into()),
            },
            qc: QcReport::default(),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_batch_counts() {
        let report = BatchReport {
            files: vec![
                failed("a_prof.nc"),
                FileReport::skipped("b_prof.nc".into()),
                FileReport {
                    path: "5904471_meta.nc".into(),
                    category: Some(FileCategory::Metadata),
                    outcome: FileOutcome::Committed(MapSummary::default()),
                    qc: QcReport::default(),
                    elapsed: Duration::ZERO,
                },
            ],
        };
        assert_eq!(report.committed(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(report.has_failures());
    }

    #[test]
    fn test_failure_display_names_stage_and_reason() {
        let line = failed("a_prof.nc").to_string();
        assert!(line.starts_with("FAILED"));
        assert!(line.contains("after normalized"));
        assert!(line.contains("PRES"));
    }

    #[test]
    fn test_stages_are_ordered() {
        assert!(IngestStage::Opened < IngestStage::Mapped);
        assert!(IngestStage::Mapped < IngestStage::Committed);
    }
}
