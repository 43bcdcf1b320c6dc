//! Shared test utilities for the argo-ingest workspace.
//!
//! This crate provides common testing infrastructure including:
//! - In-memory NetCDF documents shaped like GDAC files
//! - A document reader that serves them without touching disk
//! - Skip macros for optional real-file tests
//!
//! # Usage
//!
//! ```ignore
//! use test_utils::{meta_document, FixtureReader, ProfileFixture};
//!
//! let reader = FixtureReader::new()
//!     .with(meta_document("5904471"))
//!     .with(ProfileFixture::new("5904471", 12).document());
//! ```

pub mod builder;
pub mod fixtures;
pub mod paths;
pub mod reader;

// Re-export commonly used items at the crate root
pub use builder::{DocumentBuilder, FILL};
pub use fixtures::*;
pub use paths::*;
pub use reader::FixtureReader;

/// Macro to skip a test if the required file is not found.
///
/// Real GDAC files are large and not checked in; point `TEST_DATA_DIR` at a
/// directory holding them to run these tests.
///
/// ```ignore
/// let path = require_test_file!("5904471_meta.nc");
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: Test file '{}' not found. Download test data or set TEST_DATA_DIR.",
                    $name
                );
                return;
            }
        }
    }};
}

/// Macro for approximate floating-point equality assertions.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}
