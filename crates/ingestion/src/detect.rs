//! File category detection.
//!
//! The `DATA_TYPE` variable is authoritative when present; otherwise the
//! GDAC file naming conventions decide.

use std::path::Path;

use argo_common::FileCategory;
use netcdf_parser::Document;

use crate::error::{IngestionError, Result};

/// Decide which extractor applies to a loaded document.
pub fn detect_category(doc: &Document) -> Result<FileCategory> {
    category_from_data_type(doc)
        .or_else(|| category_from_filename(doc.path()))
        .ok_or_else(|| {
            IngestionError::SchemaMismatch(format!(
                "cannot tell whether {} holds metadata, profiles or a trajectory",
                doc.path().display()
            ))
        })
}

fn category_from_data_type(doc: &Document) -> Option<FileCategory> {
    let data_type = doc.variable("DATA_TYPE")?.strings()?.into_iter().next()?;
    let lower = data_type.to_lowercase();

    if lower.contains("meta") {
        Some(FileCategory::Metadata)
    } else if lower.contains("traj") {
        Some(FileCategory::Trajectory)
    } else if lower.contains("profile") {
        Some(FileCategory::Profile)
    } else {
        None
    }
}

/// Category implied by a file name alone.
///
/// Recognizes `<wmo>_meta.nc`, `<wmo>_Rtraj.nc`, `<wmo>_prof.nc` and the
/// single-cycle profile names such as `R5904471_012.nc` or `BD5904471_012D.nc`.
pub fn category_from_filename(path: &Path) -> Option<FileCategory> {
    let name = path.file_name()?.to_str()?.to_lowercase();
    let stem = name.strip_suffix(".nc")?;

    if stem.contains("meta") {
        Some(FileCategory::Metadata)
    } else if stem.contains("traj") {
        Some(FileCategory::Trajectory)
    } else if stem.contains("prof") || is_single_cycle_profile(stem) {
        Some(FileCategory::Profile)
    } else {
        None
    }
}

/// Whether a file name marks a BGC (`B`) file, e.g. `BR5904471_012.nc`
/// or `5904471_BRtraj.nc`.
pub fn is_bgc_filename(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let lower = name.to_lowercase();
    lower.starts_with('b') || lower.contains("_br") || lower.contains("_bd")
}

fn is_single_cycle_profile(stem: &str) -> bool {
    let digits = stem.trim_start_matches(['r', 'd', 'b', 's', 'm']);
    digits.len() < stem.len()
        && digits.contains('_')
        && digits.starts_with(|c: char| c.is_ascii_digit())
}
