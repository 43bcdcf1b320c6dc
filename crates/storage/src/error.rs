//! Error types for the storage crate.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised while mapping records onto the schema.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A profile or trajectory names a float that no metadata file has
    /// introduced.
    #[error("Float {platform_number} referenced by {context} has no metadata record")]
    ReferentialIntegrity {
        platform_number: String,
        context: String,
    },

    #[error("Failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),
}
