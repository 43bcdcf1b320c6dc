//! Native NetCDF reading using the netcdf library.
//!
//! The whole file is copied into a [`Document`] while the handle is open;
//! the handle is dropped when [`NativeReader::read`] returns, whether or
//! not the copy succeeded.

use std::path::Path;
use std::sync::Once;

use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::AttributeValue;
use num_traits::AsPrimitive;
use tracing::debug;

use crate::document::{AttrValue, Document, ElementType, Values, Variable};
use crate::error::{NetCdfError, NetCdfResult};
use crate::reader::DocumentReader;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose diagnostics to stderr even when the
/// error is handled on the Rust side (for example a truncated file that
/// we report as unreadable). Safe to call any number of times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// [`DocumentReader`] backed by libnetcdf.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeReader;

impl NativeReader {
    pub fn new() -> Self {
        silence_hdf5_errors();
        Self
    }
}

impl DocumentReader for NativeReader {
    fn read(&self, path: &Path) -> NetCdfResult<Document> {
        silence_hdf5_errors();

        let unreadable = |reason: String| NetCdfError::Unreadable {
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(unreadable("no such file".to_string()));
        }

        let file = netcdf::open(path).map_err(|e| unreadable(e.to_string()))?;
        let mut doc = Document::new(path);

        for dim in file.dimensions() {
            doc.add_dimension(dim.name(), dim.len());
        }

        for attr in file.attributes() {
            if let Some(value) = attr.value().ok().and_then(convert_attribute) {
                doc.add_attribute(attr.name(), value);
            }
        }

        for var in file.variables() {
            let name = var.name();
            let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
            let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

            let (element_type, values) = match read_values(&var) {
                Ok(Some(data)) => data,
                Ok(None) => {
                    debug!(variable = %name, "Skipping variable with unsupported type");
                    continue;
                }
                Err(e) => return Err(unreadable(format!("variable {name}: {e}"))),
            };

            let mut variable = Variable::new(name, dims, shape, element_type, values)?;
            for attr in var.attributes() {
                if let Some(value) = attr.value().ok().and_then(convert_attribute) {
                    variable = variable.with_attribute(attr.name(), value);
                }
            }
            doc.add_variable(variable)?;
        }

        debug!(
            path = %path.display(),
            variables = doc.variables().count(),
            "Loaded NetCDF document"
        );

        Ok(doc)
    }
}

fn read_values(var: &netcdf::Variable) -> Result<Option<(ElementType, Values)>, netcdf::Error> {
    let data = match var.vartype() {
        NcVariableType::Char => (ElementType::Char, Values::Text(var.get_raw_values(..)?)),
        NcVariableType::Int(IntType::I8) => (ElementType::Byte, widen::<i8>(var)?),
        NcVariableType::Int(IntType::U8) => (ElementType::UByte, widen::<u8>(var)?),
        NcVariableType::Int(IntType::I16) => (ElementType::Short, widen::<i16>(var)?),
        NcVariableType::Int(IntType::U16) => (ElementType::UShort, widen::<u16>(var)?),
        NcVariableType::Int(IntType::I32) => (ElementType::Int, widen::<i32>(var)?),
        NcVariableType::Int(IntType::U32) => (ElementType::UInt, widen::<u32>(var)?),
        NcVariableType::Int(IntType::I64) => (ElementType::Int64, widen::<i64>(var)?),
        NcVariableType::Int(IntType::U64) => (ElementType::UInt64, widen::<u64>(var)?),
        NcVariableType::Float(FloatType::F32) => (ElementType::Float, widen::<f32>(var)?),
        NcVariableType::Float(FloatType::F64) => (ElementType::Double, widen::<f64>(var)?),
        _ => return Ok(None),
    };
    Ok(Some(data))
}

fn widen<T>(var: &netcdf::Variable) -> Result<Values, netcdf::Error>
where
    T: netcdf::NcTypeDescriptor + Copy + AsPrimitive<f64>,
{
    let raw: Vec<T> = var.get_values(..)?;
    Ok(Values::Numeric(raw.into_iter().map(AsPrimitive::as_).collect()))
}

fn convert_attribute(value: AttributeValue) -> Option<AttrValue> {
    let numbers = |v: Vec<f64>| Some(AttrValue::Numbers(v));
    match value {
        AttributeValue::Str(s) => Some(AttrValue::Text(s)),
        AttributeValue::Strs(v) => Some(AttrValue::Text(v.join(" "))),
        AttributeValue::Double(x) => numbers(vec![x]),
        AttributeValue::Doubles(v) => numbers(v),
        AttributeValue::Float(x) => numbers(vec![x.into()]),
        AttributeValue::Floats(v) => numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Int(x) => numbers(vec![x.into()]),
        AttributeValue::Ints(v) => numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Short(x) => numbers(vec![x.into()]),
        AttributeValue::Shorts(v) => numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Schar(x) => numbers(vec![x.into()]),
        AttributeValue::Uchar(x) => numbers(vec![x.into()]),
        _ => None,
    }
}
