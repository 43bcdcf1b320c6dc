//! ARGO ingestion library.
//!
//! Turns loaded NetCDF documents into catalog rows:
//!
//! - [`detect_category`] decides whether a file holds float metadata,
//!   profiles or a trajectory
//! - [`extract`] pulls typed records out of the document
//! - [`QcNormalizer`] maps raw QC flags onto the canonical set
//! - [`Ingester`] runs files through the whole pipeline, one transaction
//!   per file, several files at a time

pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
mod ingester;
pub mod locks;
pub mod qc;
pub mod report;

// Re-exports
pub use config::IngestOptions;
pub use detect::{category_from_filename, detect_category, is_bgc_filename};
pub use error::{IngestionError, Result};
pub use extract::{extract, extract_metadata, extract_profiles, extract_trajectory};
pub use ingester::Ingester;
pub use locks::FloatLocks;
pub use qc::{QcNormalizer, QcPolicy, QcReport};
pub use report::{BatchReport, FileOutcome, FileReport, IngestStage};
