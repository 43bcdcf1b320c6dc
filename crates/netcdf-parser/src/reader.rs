//! The seam between the pipeline and the container format.

use std::path::Path;

use crate::document::Document;
use crate::error::NetCdfResult;

/// Loads a file into a [`Document`].
///
/// Implementations must release every handle on the file before
/// returning, on success and on error. Reads are blocking; async callers
/// run them on a blocking thread.
pub trait DocumentReader: Send + Sync {
    fn read(&self, path: &Path) -> NetCdfResult<Document>;
}
