//! NetCDF reader for ARGO float files.
//!
//! Files are loaded in one pass into a [`Document`]: named dimensions,
//! variables with declared shape and element type, and attributes. The
//! rest of the pipeline only sees the document, never the container
//! format.
//!
//! # Features
//!
//! - `native` (default): [`NativeReader`] reads files through libnetcdf.
//!   System requirements: libhdf5-dev libnetcdf-dev.
//!
//! Without `native`, documents can still be built in memory, which is
//! how the pipeline tests run.

pub mod document;
pub mod error;
#[cfg(feature = "native")]
mod native;
pub mod reader;

pub use document::{AttrValue, Document, ElementType, Values, Variable};
pub use error::{NetCdfError, NetCdfResult};
#[cfg(feature = "native")]
pub use native::{silence_hdf5_errors, NativeReader};
pub use reader::DocumentReader;
