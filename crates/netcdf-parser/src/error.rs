//! Error types for NetCDF reading operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF reading.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file is missing, corrupt, truncated, or not NetCDF
    #[error("Unreadable file {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    /// Missing required variable, dimension or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Shape or element type does not match the declared layout
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}
