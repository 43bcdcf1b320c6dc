//! Error types for the ingestion crate.

use std::time::Duration;

use netcdf_parser::NetCdfError;
use storage::StorageError;
use thiserror::Error;

/// Errors that can occur while ingesting one file.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Unreadable file: {0}")]
    UnreadableFile(#[from] NetCdfError),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Malformed record ({record}): {reason}")]
    MalformedRecord { record: String, reason: String },

    #[error("Referential integrity violation for float {platform_number}: {context}")]
    ReferentialIntegrity {
        platform_number: String,
        context: String,
    },

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IngestionError {
    pub(crate) fn malformed(record: impl Into<String>, reason: impl Into<String>) -> Self {
        IngestionError::MalformedRecord {
            record: record.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestionError::UnreadableFile(_) => "unreadable_file",
            IngestionError::SchemaMismatch(_) => "schema_mismatch",
            IngestionError::MalformedRecord { .. } => "malformed_record",
            IngestionError::ReferentialIntegrity { .. } => "referential_integrity",
            IngestionError::Timeout { .. } => "timeout",
            IngestionError::Storage(_) => "storage",
            IngestionError::Join(_) => "worker",
        }
    }
}

impl From<StorageError> for IngestionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ReferentialIntegrity {
                platform_number,
                context,
            } => IngestionError::ReferentialIntegrity {
                platform_number,
                context,
            },
            other => IngestionError::Storage(other),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
