//! Read-only structured view of a NetCDF file.
//!
//! Values are held as either raw character bytes (`NC_CHAR` variables,
//! which ARGO uses for strings and single-character flags) or `f64`
//! (every numeric type, widened). The declared [`ElementType`] is kept so
//! callers can still tell integer variables from floating ones.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{NetCdfError, NetCdfResult};

/// Declared element type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Char,
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    UInt,
    Int64,
    UInt64,
    Float,
    Double,
}

impl ElementType {
    pub fn is_char(&self) -> bool {
        matches!(self, ElementType::Char)
    }
}

/// Variable data, flattened in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Text(Vec<u8>),
    Numeric(Vec<f64>),
}

impl Values {
    pub fn len(&self) -> usize {
        match self {
            Values::Text(v) => v.len(),
            Values::Numeric(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Attribute value. Numeric attributes are widened to `f64`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Numbers(Vec<f64>),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Numbers(_) => None,
        }
    }

    /// First element of a numeric attribute.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Numbers(v) => v.first().copied(),
            AttrValue::Text(_) => None,
        }
    }
}

/// A named, shaped array with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    dimensions: Vec<String>,
    shape: Vec<usize>,
    element_type: ElementType,
    values: Values,
    attributes: BTreeMap<String, AttrValue>,
}

impl Variable {
    /// Create a variable, checking that the data matches the declared
    /// shape and element type.
    pub fn new(
        name: impl Into<String>,
        dimensions: Vec<String>,
        shape: Vec<usize>,
        element_type: ElementType,
        values: Values,
    ) -> NetCdfResult<Self> {
        let name = name.into();
        if dimensions.len() != shape.len() {
            return Err(NetCdfError::InvalidFormat(format!(
                "{name}: {} dimension names for rank {}",
                dimensions.len(),
                shape.len()
            )));
        }
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(NetCdfError::InvalidFormat(format!(
                "{name}: expected {expected} values for shape {shape:?}, found {}",
                values.len()
            )));
        }
        match (&values, element_type.is_char()) {
            (Values::Text(_), true) | (Values::Numeric(_), false) => {}
            _ => {
                return Err(NetCdfError::InvalidFormat(format!(
                    "{name}: data does not match element type {element_type:?}"
                )))
            }
        }
        Ok(Self {
            name,
            dimensions,
            shape,
            element_type,
            values,
            attributes: BTreeMap::new(),
        })
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The `_FillValue` attribute, if numeric.
    pub fn fill_value(&self) -> Option<f64> {
        self.attribute("_FillValue").and_then(AttrValue::as_f64)
    }

    /// Raw numeric data.
    pub fn numbers(&self) -> Option<&[f64]> {
        match &self.values {
            Values::Numeric(v) => Some(v),
            Values::Text(_) => None,
        }
    }

    /// Numeric data with `_FillValue` and NaN cells replaced by `None`.
    pub fn masked(&self) -> Option<Vec<Option<f64>>> {
        let fill = self.fill_value();
        let values = self.numbers()?;
        Some(
            values
                .iter()
                .map(|&v| {
                    let is_fill = fill.is_some_and(|f| v == f);
                    (!v.is_nan() && !is_fill).then_some(v)
                })
                .collect(),
        )
    }

    /// Raw character cells, one byte per element.
    pub fn chars(&self) -> Option<&[u8]> {
        match &self.values {
            Values::Text(v) => Some(v),
            Values::Numeric(_) => None,
        }
    }

    /// Character data as strings, treating the last dimension as the
    /// string length. Trailing blanks and NULs are trimmed. A rank-0
    /// variable yields one single-character string.
    pub fn strings(&self) -> Option<Vec<String>> {
        let bytes = self.chars()?;
        let width = self.shape.last().copied().unwrap_or(1);
        if width == 0 {
            let rows: usize = self.shape.iter().rev().skip(1).product();
            return Some(vec![String::new(); rows]);
        }
        Some(
            bytes
                .chunks(width)
                .map(|chunk| {
                    String::from_utf8_lossy(chunk)
                        .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
                        .trim_start()
                        .to_string()
                })
                .collect(),
        )
    }
}

/// An entire file loaded in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    path: PathBuf,
    dimensions: BTreeMap<String, usize>,
    variables: BTreeMap<String, Variable>,
    attributes: BTreeMap<String, AttrValue>,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Path the document was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add_dimension(&mut self, name: impl Into<String>, len: usize) {
        self.dimensions.insert(name.into(), len);
    }

    pub fn add_attribute(&mut self, name: impl Into<String>, value: AttrValue) {
        self.attributes.insert(name.into(), value);
    }

    /// Add a variable. Every dimension it names must already exist with
    /// the same length.
    pub fn add_variable(&mut self, variable: Variable) -> NetCdfResult<()> {
        for (dim, &len) in variable.dimensions.iter().zip(&variable.shape) {
            match self.dimensions.get(dim) {
                Some(&declared) if declared == len => {}
                Some(&declared) => {
                    return Err(NetCdfError::InvalidFormat(format!(
                        "{}: dimension {dim} has length {declared}, variable uses {len}",
                        variable.name
                    )))
                }
                None => {
                    return Err(NetCdfError::MissingData(format!(
                        "dimension {dim} used by {}",
                        variable.name
                    )))
                }
            }
        }
        self.variables.insert(variable.name.clone(), variable);
        Ok(())
    }

    pub fn dimension(&self, name: &str) -> Option<usize> {
        self.dimensions.get(name).copied()
    }

    pub fn dimensions(&self) -> impl Iterator<Item = (&str, usize)> {
        self.dimensions.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }
}
