//! ARGO quality-control flag vocabulary (reference table 2).

use serde::{Deserialize, Serialize};

use crate::error::{VocabularyError, VocabularyResult};

/// A QC code exactly as it appears in a file, before normalization.
///
/// ARGO stores QC flags as single characters; blank (space or NUL) means
/// no flag was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawQc(pub u8);

impl RawQc {
    /// A blank QC cell.
    pub const BLANK: RawQc = RawQc(b' ');

    pub fn is_blank(&self) -> bool {
        matches!(self.0, b' ' | 0)
    }
}

impl From<char> for RawQc {
    fn from(c: char) -> Self {
        RawQc(u8::try_from(c).unwrap_or(b'?'))
    }
}

/// Canonical QC flag.
///
/// `Unknown` keeps the offending byte so it can be reported; it is never
/// persisted as such (see [`QcFlag::canonical`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QcFlag {
    /// 0: no QC was performed
    NoQc,
    /// 1: good data
    Good,
    /// 2: probably good data
    ProbablyGood,
    /// 3: bad data that are potentially correctable
    ProbablyBad,
    /// 4: bad data
    Bad,
    /// 5: value changed
    Changed,
    /// 8: estimated / interpolated value
    Interpolated,
    /// 9: missing value
    Missing,
    /// Any code outside the vocabulary
    Unknown(u8),
}

impl QcFlag {
    /// Every flag that can be persisted, in code order.
    pub const ALL: [QcFlag; 8] = [
        QcFlag::NoQc,
        QcFlag::Good,
        QcFlag::ProbablyGood,
        QcFlag::ProbablyBad,
        QcFlag::Bad,
        QcFlag::Changed,
        QcFlag::Interpolated,
        QcFlag::Missing,
    ];

    /// Parse a raw file code. Blank cells parse as `NoQc`; codes 6 and 7
    /// are reserved by ARGO and parse as `Unknown`.
    pub fn from_raw(raw: RawQc) -> Self {
        if raw.is_blank() {
            return QcFlag::NoQc;
        }
        match raw.0 {
            b'0' => QcFlag::NoQc,
            b'1' => QcFlag::Good,
            b'2' => QcFlag::ProbablyGood,
            b'3' => QcFlag::ProbablyBad,
            b'4' => QcFlag::Bad,
            b'5' => QcFlag::Changed,
            b'8' => QcFlag::Interpolated,
            b'9' => QcFlag::Missing,
            other => QcFlag::Unknown(other),
        }
    }

    /// Parse a stored code (the output of [`QcFlag::as_str`]).
    pub fn from_code(code: &str) -> VocabularyResult<Self> {
        match code.as_bytes() {
            [b] => match QcFlag::from_raw(RawQc(*b)) {
                QcFlag::Unknown(_) => Err(VocabularyError::UnknownQcFlag(code.to_string())),
                flag => Ok(flag),
            },
            _ => Err(VocabularyError::UnknownQcFlag(code.to_string())),
        }
    }

    /// Unknown codes collapse to `Bad`.
    pub fn canonical(self) -> Self {
        match self {
            QcFlag::Unknown(_) => QcFlag::Bad,
            flag => flag,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, QcFlag::Unknown(_))
    }

    /// Single-character storage code.
    pub fn as_str(&self) -> &'static str {
        match self.canonical() {
            QcFlag::NoQc => "0",
            QcFlag::Good => "1",
            QcFlag::ProbablyGood => "2",
            QcFlag::ProbablyBad => "3",
            QcFlag::Bad | QcFlag::Unknown(_) => "4",
            QcFlag::Changed => "5",
            QcFlag::Interpolated => "8",
            QcFlag::Missing => "9",
        }
    }

    pub fn label(&self) -> &'static str {
        match self.canonical() {
            QcFlag::NoQc => "No QC performed",
            QcFlag::Good => "Good data",
            QcFlag::ProbablyGood => "Probably good data",
            QcFlag::ProbablyBad => "Bad data that are potentially correctable",
            QcFlag::Bad | QcFlag::Unknown(_) => "Bad data",
            QcFlag::Changed => "Value changed",
            QcFlag::Interpolated => "Estimated value",
            QcFlag::Missing => "Missing value",
        }
    }
}

impl std::fmt::Display for QcFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QcFlag::Unknown(b) => write!(f, "unknown({:?})", char::from(*b)),
            flag => f.write_str(flag.as_str()),
        }
    }
}
