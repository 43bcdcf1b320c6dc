//! Record extractors, one per file category.
//!
//! Extraction is synchronous and operates on a fully loaded [`Document`];
//! no file handle is held here.

mod fields;
mod history;
mod metadata;
mod profile;
mod trajectory;

use argo_common::{ExtractedRecord, FileCategory};
use netcdf_parser::Document;

use crate::error::Result;

pub use metadata::extract_metadata;
pub use profile::extract_profiles;
pub use trajectory::extract_trajectory;

/// Run the extractor for `category` and collect its records.
pub fn extract(doc: &Document, category: FileCategory) -> Result<Vec<ExtractedRecord>> {
    let source_file = doc.path().display().to_string();
    Ok(match category {
        FileCategory::Metadata => vec![ExtractedRecord::Metadata(extract_metadata(doc, &source_file)?)],
        FileCategory::Profile => extract_profiles(doc, &source_file)?
            .into_iter()
            .map(ExtractedRecord::Profile)
            .collect(),
        FileCategory::Trajectory => {
            vec![ExtractedRecord::Trajectory(extract_trajectory(doc, &source_file)?)]
        }
    })
}
