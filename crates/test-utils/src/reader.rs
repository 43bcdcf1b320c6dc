//! A [`DocumentReader`] serving prebuilt documents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use netcdf_parser::{Document, DocumentReader, NetCdfError, NetCdfResult};

/// Serves documents by path; unknown paths are unreadable.
#[derive(Debug, Clone, Default)]
pub struct FixtureReader {
    documents: HashMap<PathBuf, Document>,
    delay: Option<Duration>,
}

impl FixtureReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under its own path.
    pub fn with(mut self, doc: Document) -> Self {
        self.insert(doc);
        self
    }

    pub fn insert(&mut self, doc: Document) -> PathBuf {
        let path = doc.path().to_path_buf();
        self.documents.insert(path.clone(), doc);
        path
    }

    /// Block every read for `delay`, like a slow disk.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl DocumentReader for FixtureReader {
    fn read(&self, path: &Path) -> NetCdfResult<Document> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| NetCdfError::Unreadable {
                path: path.to_path_buf(),
                reason: "no such fixture".to_string(),
            })
    }
}
