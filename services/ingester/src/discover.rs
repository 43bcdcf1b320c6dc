//! Input discovery.
//!
//! Command-line inputs may be files or directories. Directories are
//! walked recursively for `*.nc`. Metadata files are returned separately
//! so they can be committed before the profiles and trajectories that
//! reference their floats.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

use argo_common::FileCategory;
use ingestion::category_from_filename;

/// Files to ingest, split by submission order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Discovered {
    pub metadata: Vec<PathBuf>,
    pub data: Vec<PathBuf>,
}

impl Discovered {
    pub fn len(&self) -> usize {
        self.metadata.len() + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_netcdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("nc"))
}

/// Expand inputs into a deduplicated, sorted file list.
///
/// Explicit files are kept whatever their extension; the category check
/// later reports them if they are not ARGO files.
pub fn discover(inputs: &[PathBuf]) -> Result<Discovered> {
    let mut files = BTreeSet::new();

    for input in inputs {
        if input.is_file() {
            files.insert(input.clone());
        } else if input.is_dir() {
            for entry in WalkDir::new(input).follow_links(true) {
                match entry {
                    Ok(entry) if entry.file_type().is_file() && is_netcdf(entry.path()) => {
                        files.insert(entry.into_path());
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Skipping unreadable directory entry"),
                }
            }
        } else {
            bail!("Input does not exist: {}", input.display());
        }
    }

    let (metadata, data): (Vec<_>, Vec<_>) = files
        .into_iter()
        .partition(|p| category_from_filename(p) == Some(FileCategory::Metadata));

    debug!(metadata = metadata.len(), data = data.len(), "Discovered input files");
    Ok(Discovered { metadata, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_walks_directories_for_netcdf() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "5904471/5904471_meta.nc");
        touch(tmp.path(), "5904471/profiles/R5904471_012.nc");
        touch(tmp.path(), "5904471/profiles/D5904471_011.NC");
        touch(tmp.path(), "5904471/README.txt");

        let found = discover(&[tmp.path().to_path_buf()]).unwrap();
        assert_eq!(found.metadata.len(), 1);
        assert!(found.metadata[0].ends_with("5904471_meta.nc"));
        assert_eq!(found.data.len(), 2);
        assert!(found.data[0].ends_with("D5904471_011.NC"));
    }

    #[test]
    fn test_explicit_files_are_deduplicated() {
        let tmp = tempfile::tempdir().unwrap();
        let prof = touch(tmp.path(), "5904471_prof.nc");

        let found = discover(&[prof.clone(), tmp.path().to_path_buf(), prof]).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.metadata.is_empty());
    }

    #[test]
    fn test_missing_input_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover(&[tmp.path().join("nope")]).is_err());
    }

    #[test]
    fn test_empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover(&[tmp.path().to_path_buf()]).unwrap().is_empty());
    }
}
