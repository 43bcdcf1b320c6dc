//! Error types for ARGO vocabulary parsing.

use thiserror::Error;

/// Result type alias using VocabularyError.
pub type VocabularyResult<T> = Result<T, VocabularyError>;

/// Failure to map a stored or textual code onto a fixed ARGO vocabulary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("Unknown data mode: {0:?}")]
    UnknownDataMode(String),

    #[error("Unknown profile direction: {0:?}")]
    UnknownDirection(String),

    #[error("Unknown data family: {0:?}")]
    UnknownDataFamily(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Unknown QC flag: {0:?}")]
    UnknownQcFlag(String),
}
