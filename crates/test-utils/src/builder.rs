//! In-memory NetCDF documents for tests.
//!
//! Builders panic on inconsistent input; they are for test code only.

use std::path::PathBuf;

use netcdf_parser::{AttrValue, Document, ElementType, Values, Variable};

/// ARGO's numeric fill value.
pub const FILL: f64 = 99999.0;

/// Incrementally assembles a [`Document`].
pub struct DocumentBuilder {
    doc: Document,
}

impl DocumentBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            doc: Document::new(path),
        }
    }

    pub fn dim(mut self, name: &str, len: usize) -> Self {
        self.doc.add_dimension(name, len);
        self
    }

    fn shape(&self, dims: &[&str]) -> Vec<usize> {
        dims.iter()
            .map(|d| {
                self.doc
                    .dimension(d)
                    .unwrap_or_else(|| panic!("dimension {d} not declared"))
            })
            .collect()
    }

    fn push(mut self, variable: Variable) -> Self {
        self.doc
            .add_variable(variable)
            .expect("variable should match its dimensions");
        self
    }

    fn variable(&self, name: &str, dims: &[&str], element_type: ElementType, values: Values) -> Variable {
        Variable::new(
            name,
            dims.iter().map(|d| d.to_string()).collect(),
            self.shape(dims),
            element_type,
            values,
        )
        .expect("variable data should match its shape")
    }

    /// Fixed-width strings; the last dimension is the string length.
    /// Rows are blank-padded or truncated.
    pub fn text(self, name: &str, dims: &[&str], rows: &[&str]) -> Self {
        let shape = self.shape(dims);
        let width = shape.last().copied().unwrap_or(1);
        let count: usize = shape.iter().rev().skip(1).product();
        assert_eq!(rows.len(), count, "{name}: row count");

        let mut bytes = Vec::with_capacity(count * width);
        for row in rows {
            let mut cell: Vec<u8> = row.bytes().take(width).collect();
            cell.resize(width, b' ');
            bytes.extend(cell);
        }
        let var = self.variable(name, dims, ElementType::Char, Values::Text(bytes));
        self.push(var)
    }

    /// One character per cell, e.g. a QC flag column.
    pub fn chars(self, name: &str, dims: &[&str], codes: &str) -> Self {
        let var = self.variable(
            name,
            dims,
            ElementType::Char,
            Values::Text(codes.as_bytes().to_vec()),
        );
        self.push(var)
    }

    /// Double-precision values with `_FillValue` 99999.
    pub fn doubles(self, name: &str, dims: &[&str], values: &[f64]) -> Self {
        let var = self
            .variable(name, dims, ElementType::Double, Values::Numeric(values.to_vec()))
            .with_attribute("_FillValue", AttrValue::Numbers(vec![FILL]));
        self.push(var)
    }

    /// Integer values with `_FillValue` 99999.
    pub fn ints(self, name: &str, dims: &[&str], values: &[i64]) -> Self {
        let numbers = values.iter().map(|&v| v as f64).collect();
        let var = self
            .variable(name, dims, ElementType::Int, Values::Numeric(numbers))
            .with_attribute("_FillValue", AttrValue::Numbers(vec![FILL]));
        self.push(var)
    }

    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        self.doc.add_attribute(name, AttrValue::Text(value.to_string()));
        self
    }

    pub fn build(self) -> Document {
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_rows_are_padded() {
        let doc = DocumentBuilder::new("x.nc")
            .dim("N_PROF", 2)
            .dim("STRING8", 8)
            .text("PLATFORM_NUMBER", &["N_PROF", "STRING8"], &["5904471", "69012345678"])
            .build();
        let var = doc.variable("PLATFORM_NUMBER").unwrap();
        assert_eq!(var.len(), 16);
        assert_eq!(var.strings().unwrap(), vec!["5904471", "69012345"]);
    }

    #[test]
    fn test_scalar_chars() {
        let doc = DocumentBuilder::new("x.nc").chars("LAUNCH_QC", &[], "1").build();
        assert_eq!(doc.variable("LAUNCH_QC").unwrap().chars().unwrap(), b"1");
    }
}
