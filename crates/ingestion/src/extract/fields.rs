//! Typed access to ARGO variables.
//!
//! Every accessor distinguishes an absent variable (`Ok(None)`) from one
//! present with the wrong kind or length (`Err(SchemaMismatch)`).

use chrono::{DateTime, Utc};
use tracing::warn;

use argo_common::{parse_argo_date, Parameter, RawQc, RawValue};
use netcdf_parser::{Document, Variable};

use crate::error::{IngestionError, Result};

/// Numeric cells at or above this magnitude are ARGO fill, whatever the
/// variable's `_FillValue` says.
pub(crate) const ARGO_FILL_THRESHOLD: f64 = 99_999.0;

pub(crate) struct Fields<'a> {
    doc: &'a Document,
}

impl<'a> Fields<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    pub fn dimension(&self, name: &str) -> Result<usize> {
        self.doc
            .dimension(name)
            .ok_or_else(|| IngestionError::SchemaMismatch(format!("missing dimension {name}")))
    }

    pub fn optional_dimension(&self, name: &str) -> Option<usize> {
        self.doc.dimension(name)
    }

    pub fn require(&self, name: &str) -> Result<&'a Variable> {
        self.doc
            .variable(name)
            .ok_or_else(|| IngestionError::SchemaMismatch(format!("missing variable {name}")))
    }

    /// Strings of a character variable, one per row.
    pub fn strings(&self, name: &str, rows: usize) -> Result<Option<Vec<String>>> {
        let Some(var) = self.doc.variable(name) else {
            return Ok(None);
        };
        let strings = var.strings().ok_or_else(|| not_text(name))?;
        check_len(name, strings.len(), rows)?;
        Ok(Some(strings))
    }

    pub fn required_strings(&self, name: &str, rows: usize) -> Result<Vec<String>> {
        self.require(name)?;
        Ok(self.strings(name, rows)?.unwrap_or_default())
    }

    /// First non-empty string of a character variable.
    pub fn text(&self, name: &str) -> Result<Option<String>> {
        let Some(var) = self.doc.variable(name) else {
            return Ok(None);
        };
        let strings = var.strings().ok_or_else(|| not_text(name))?;
        Ok(strings.into_iter().find(|s| !s.is_empty()))
    }

    /// One flag byte per cell.
    pub fn codes(&self, name: &str, len: usize) -> Result<Option<Vec<u8>>> {
        let Some(var) = self.doc.variable(name) else {
            return Ok(None);
        };
        let chars = var.chars().ok_or_else(|| not_text(name))?;
        check_len(name, chars.len(), len)?;
        Ok(Some(chars.to_vec()))
    }

    /// Numeric cells with fill and NaN as `None`.
    pub fn numbers(&self, name: &str, len: usize) -> Result<Option<Vec<Option<f64>>>> {
        let Some(var) = self.doc.variable(name) else {
            return Ok(None);
        };
        let masked = var.masked().ok_or_else(|| {
            IngestionError::SchemaMismatch(format!("{name} is not a numeric variable"))
        })?;
        check_len(name, masked.len(), len)?;
        Ok(Some(
            masked
                .into_iter()
                .map(|v| v.filter(|x| x.abs() < ARGO_FILL_THRESHOLD))
                .collect(),
        ))
    }

    pub fn required_numbers(&self, name: &str, len: usize) -> Result<Vec<Option<f64>>> {
        self.require(name)?;
        Ok(self.numbers(name, len)?.unwrap_or_default())
    }

    /// A scalar numeric variable.
    pub fn scalar(&self, name: &str) -> Result<Option<f64>> {
        Ok(self.numbers(name, 1)?.and_then(|v| v.into_iter().next().flatten()))
    }

    /// A scalar flag variable.
    pub fn scalar_code(&self, name: &str) -> Result<RawQc> {
        Ok(self
            .codes(name, 1)?
            .and_then(|v| v.first().copied())
            .map(RawQc)
            .unwrap_or(RawQc::BLANK))
    }

    /// A `YYYYMMDDHHMISS` date. Unparseable text is logged and dropped.
    pub fn date(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        let Some(text) = self.text(name)? else {
            return Ok(None);
        };
        Ok(self.parse_date(name, &text))
    }

    /// One `YYYYMMDDHHMISS` date per row; blank rows are `None`.
    pub fn dates(&self, name: &str, rows: usize) -> Result<Option<Vec<Option<DateTime<Utc>>>>> {
        let Some(strings) = self.strings(name, rows)? else {
            return Ok(None);
        };
        Ok(Some(
            strings
                .iter()
                .map(|text| (!text.is_empty()).then(|| self.parse_date(name, text)).flatten())
                .collect(),
        ))
    }

    fn parse_date(&self, name: &str, text: &str) -> Option<DateTime<Utc>> {
        let parsed = parse_argo_date(text);
        if parsed.is_none() {
            warn!(
                variable = name,
                value = %text,
                path = %self.doc.path().display(),
                "Ignoring unparseable date"
            );
        }
        parsed
    }
}

/// All columns of one parameter.
pub(crate) struct ParameterColumns {
    pub parameter: Parameter,
    values: Option<Vec<Option<f64>>>,
    qc: Option<Vec<u8>>,
    adjusted: Option<Vec<Option<f64>>>,
    adjusted_qc: Option<Vec<u8>>,
    adjusted_error: Option<Vec<Option<f64>>>,
}

impl ParameterColumns {
    pub fn load(f: &Fields<'_>, parameter: Parameter, cells: usize) -> Result<Option<Self>> {
        let name = parameter.variable();
        let values = f.numbers(name, cells)?;
        let adjusted = f.numbers(&format!("{name}_ADJUSTED"), cells)?;
        if values.is_none() && adjusted.is_none() {
            return Ok(None);
        }
        Ok(Some(Self {
            parameter,
            values,
            qc: f.codes(&format!("{name}_QC"), cells)?,
            adjusted,
            adjusted_qc: f.codes(&format!("{name}_ADJUSTED_QC"), cells)?,
            adjusted_error: f.numbers(&format!("{name}_ADJUSTED_ERROR"), cells)?,
        }))
    }

    /// Every catalog parameter present in the document, in
    /// [`Parameter::ALL`] order.
    pub fn load_all(f: &Fields<'_>, cells: usize) -> Result<Vec<Self>> {
        let mut columns = Vec::new();
        for parameter in Parameter::ALL {
            if let Some(c) = Self::load(f, parameter, cells)? {
                columns.push(c);
            }
        }
        Ok(columns)
    }

    pub fn value_at(&self, i: usize) -> RawValue {
        RawValue {
            value: number_at(&self.values, i),
            qc: code_at(&self.qc, i),
            adjusted: number_at(&self.adjusted, i),
            adjusted_qc: code_at(&self.adjusted_qc, i),
            adjusted_error: number_at(&self.adjusted_error, i),
        }
    }
}


fn not_text(name: &str) -> IngestionError {
    IngestionError::SchemaMismatch(format!("{name} is not a character variable"))
}

fn check_len(name: &str, actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(IngestionError::SchemaMismatch(format!(
            "{name} has {actual} cells, expected {expected}"
        )))
    }
}

/// Cell `i` of an optional numeric column.
pub(crate) fn number_at(column: &Option<Vec<Option<f64>>>, i: usize) -> Option<f64> {
    column.as_ref().and_then(|c| c.get(i).copied().flatten())
}

/// Cell `i` of an optional flag column, blank when absent.
pub(crate) fn code_at(column: &Option<Vec<u8>>, i: usize) -> RawQc {
    column
        .as_ref()
        .and_then(|c| c.get(i).copied())
        .map(RawQc)
        .unwrap_or(RawQc::BLANK)
}

/// Row `i` of an optional string column, `None` when empty.
pub(crate) fn string_at(column: &Option<Vec<String>>, i: usize) -> Option<String> {
    column
        .as_ref()
        .and_then(|c| c.get(i))
        .filter(|s| !s.is_empty())
        .cloned()
}

/// A whole-number cell as an integer.
pub(crate) fn integer(value: Option<f64>) -> Option<i64> {
    value.filter(|v| v.fract() == 0.0).map(|v| v as i64)
}
