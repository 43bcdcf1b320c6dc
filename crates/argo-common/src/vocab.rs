//! Fixed ARGO vocabularies: data modes, profile directions, file
//! categories, data families and the measured parameter catalog.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VocabularyError;

/// Processing state of a profile or cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataMode {
    /// R: real-time, automatic QC only
    RealTime,
    /// A: real-time with adjusted values
    Adjusted,
    /// D: delayed mode, scientifically reviewed
    Delayed,
}

impl DataMode {
    pub const ALL: [DataMode; 3] = [DataMode::RealTime, DataMode::Adjusted, DataMode::Delayed];

    pub fn from_code(code: u8) -> Option<Self> {
        match code.to_ascii_uppercase() {
            b'R' => Some(DataMode::RealTime),
            b'A' => Some(DataMode::Adjusted),
            b'D' => Some(DataMode::Delayed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataMode::RealTime => "R",
            DataMode::Adjusted => "A",
            DataMode::Delayed => "D",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DataMode::RealTime => "Real-time",
            DataMode::Adjusted => "Real-time adjusted",
            DataMode::Delayed => "Delayed mode",
        }
    }
}

impl FromStr for DataMode {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes() {
            [b] => DataMode::from_code(*b).ok_or_else(|| VocabularyError::UnknownDataMode(s.into())),
            _ => Err(VocabularyError::UnknownDataMode(s.to_string())),
        }
    }
}

/// Direction of a vertical profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// ARGO writes `A` or `D`; anything else is treated as the default
    /// ascending profile.
    pub fn from_code(code: u8) -> Self {
        match code.to_ascii_uppercase() {
            b'D' => Direction::Descending,
            _ => Direction::Ascending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "A",
            Direction::Descending => "D",
        }
    }
}

impl FromStr for Direction {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Direction::Ascending),
            "D" => Ok(Direction::Descending),
            _ => Err(VocabularyError::UnknownDirection(s.to_string())),
        }
    }
}

/// Category of an ARGO NetCDF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileCategory {
    Metadata,
    Profile,
    Trajectory,
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileCategory::Metadata => "metadata",
            FileCategory::Profile => "profile",
            FileCategory::Trajectory => "trajectory",
        })
    }
}

/// Which GDAC file family a record came from.
///
/// Core files carry pressure, temperature and salinity; BGC (`B`) files
/// carry pressure and the biogeochemical parameters for the same cycles.
/// Rows from the two families are stored side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataFamily {
    Core,
    Bgc,
}

impl DataFamily {
    pub const ALL: [DataFamily; 2] = [DataFamily::Core, DataFamily::Bgc];

    /// A record holding any non-core parameter is BGC.
    pub fn of<I>(parameters: I) -> Self
    where
        I: IntoIterator<Item = Parameter>,
    {
        if parameters.into_iter().any(|p| !p.is_core()) {
            DataFamily::Bgc
        } else {
            DataFamily::Core
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataFamily::Core => "core",
            DataFamily::Bgc => "bgc",
        }
    }
}

impl fmt::Display for DataFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFamily {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataFamily::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| VocabularyError::UnknownDataFamily(s.to_string()))
    }
}

/// Measured parameters recognized in profile files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Parameter {
    Pres,
    Temp,
    Psal,
    Doxy,
    Nitrate,
    PhInSituTotal,
    Chla,
    Bbp700,
}

impl Parameter {
    pub const ALL: [Parameter; 8] = [
        Parameter::Pres,
        Parameter::Temp,
        Parameter::Psal,
        Parameter::Doxy,
        Parameter::Nitrate,
        Parameter::PhInSituTotal,
        Parameter::Chla,
        Parameter::Bbp700,
    ];

    /// Base variable name in ARGO files; `_QC`, `_ADJUSTED`,
    /// `_ADJUSTED_QC` and `_ADJUSTED_ERROR` are suffixed to it.
    pub fn variable(&self) -> &'static str {
        match self {
            Parameter::Pres => "PRES",
            Parameter::Temp => "TEMP",
            Parameter::Psal => "PSAL",
            Parameter::Doxy => "DOXY",
            Parameter::Nitrate => "NITRATE",
            Parameter::PhInSituTotal => "PH_IN_SITU_TOTAL",
            Parameter::Chla => "CHLA",
            Parameter::Bbp700 => "BBP700",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            Parameter::Pres => "decibar",
            Parameter::Temp => "degree_Celsius",
            Parameter::Psal => "psu",
            Parameter::Doxy => "micromole/kg",
            Parameter::Nitrate => "micromole/kg",
            Parameter::PhInSituTotal => "dimensionless",
            Parameter::Chla => "mg/m3",
            Parameter::Bbp700 => "m-1",
        }
    }

    /// Core parameters are carried by every float; the rest are
    /// biogeochemical.
    pub fn is_core(&self) -> bool {
        matches!(self, Parameter::Pres | Parameter::Temp | Parameter::Psal)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.variable())
    }
}

impl FromStr for Parameter {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::ALL
            .into_iter()
            .find(|p| p.variable().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VocabularyError::UnknownParameter(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_mode_codes() {
        assert_eq!(DataMode::from_code(b'R'), Some(DataMode::RealTime));
        assert_eq!(DataMode::from_code(b'd'), Some(DataMode::Delayed));
        assert_eq!(DataMode::from_code(b' '), None);
        assert_eq!("A".parse::<DataMode>().unwrap(), DataMode::Adjusted);
        assert!("X".parse::<DataMode>().is_err());
    }

    #[test]
    fn test_direction_defaults_to_ascending() {
        assert_eq!(Direction::from_code(b'D'), Direction::Descending);
        assert_eq!(Direction::from_code(b'A'), Direction::Ascending);
        assert_eq!(Direction::from_code(b' '), Direction::Ascending);
    }

    #[test]
    fn test_parameter_lookup() {
        assert_eq!("TEMP".parse::<Parameter>().unwrap(), Parameter::Temp);
        assert_eq!("ph_in_situ_total".parse::<Parameter>().unwrap(), Parameter::PhInSituTotal);
        assert!("CNDC".parse::<Parameter>().is_err());
        assert!(Parameter::Psal.is_core());
        assert!(!Parameter::Doxy.is_core());
    }

    #[test]
    fn test_data_family_of_parameters() {
        assert_eq!(
            DataFamily::of([Parameter::Pres, Parameter::Temp, Parameter::Psal]),
            DataFamily::Core
        );
        assert_eq!(DataFamily::of([Parameter::Pres, Parameter::Doxy]), DataFamily::Bgc);
        assert_eq!(DataFamily::of(std::iter::empty()), DataFamily::Core);
        assert_eq!("bgc".parse::<DataFamily>().unwrap(), DataFamily::Bgc);
        assert!("B".parse::<DataFamily>().is_err());
    }
}
