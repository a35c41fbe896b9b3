//! Physical quantities and unit conversion.
//!
//! Setting values such as `"0.1GeV"` or `"33um 26um -500um"` are only
//! interpreted by the module that declares them. This module turns such text
//! into a value + unit pair and converts it into the framework's internal
//! units: mm, ns, MeV, MV, K, rad, e (elementary charge). A tesla is 1e-3 in
//! these units.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Length,
    Time,
    Energy,
    Voltage,
    MagneticField,
    Temperature,
    Angle,
    Charge,
    Dimensionless,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dimension::Length => "length",
            Dimension::Time => "time",
            Dimension::Energy => "energy",
            Dimension::Voltage => "voltage",
            Dimension::MagneticField => "magnetic field",
            Dimension::Temperature => "temperature",
            Dimension::Angle => "angle",
            Dimension::Charge => "charge",
            Dimension::Dimensionless => "dimensionless",
        };
        f.write_str(s)
    }
}

/// Unit symbol, dimension, factor to internal units.
const UNITS: &[(&str, Dimension, f64)] = &[
    ("nm", Dimension::Length, 1e-6),
    ("um", Dimension::Length, 1e-3),
    ("mm", Dimension::Length, 1.0),
    ("cm", Dimension::Length, 10.0),
    ("m", Dimension::Length, 1e3),
    ("ps", Dimension::Time, 1e-3),
    ("ns", Dimension::Time, 1.0),
    ("us", Dimension::Time, 1e3),
    ("ms", Dimension::Time, 1e6),
    ("s", Dimension::Time, 1e9),
    ("eV", Dimension::Energy, 1e-6),
    ("keV", Dimension::Energy, 1e-3),
    ("MeV", Dimension::Energy, 1.0),
    ("GeV", Dimension::Energy, 1e3),
    ("TeV", Dimension::Energy, 1e6),
    ("V", Dimension::Voltage, 1e-6),
    ("kV", Dimension::Voltage, 1e-3),
    ("MV", Dimension::Voltage, 1.0),
    ("mT", Dimension::MagneticField, 1e-6),
    ("T", Dimension::MagneticField, 1e-3),
    ("K", Dimension::Temperature, 1.0),
    ("rad", Dimension::Angle, 1.0),
    ("mrad", Dimension::Angle, 1e-3),
    ("deg", Dimension::Angle, PI / 180.0),
    ("e", Dimension::Charge, 1.0),
    ("ke", Dimension::Charge, 1e3),
    ("fC", Dimension::Charge, 6241.509074460763),
    ("C", Dimension::Charge, 6.241509074460763e18),
];

#[derive(Debug, Error, PartialEq)]
pub enum UnitError {
    #[error("empty quantity")]
    Empty,

    #[error("'{0}' is not a number with an optional unit")]
    InvalidNumber(String),

    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("unit '{unit}' measures {found}, expected {expected}")]
    WrongDimension {
        unit: String,
        expected: Dimension,
        found: Dimension,
    },

    #[error("expected {expected} components in '{text}', found {found}")]
    WrongCount {
        text: String,
        expected: usize,
        found: usize,
    },
}

/// Looks up a unit symbol.
pub fn lookup(unit: &str) -> Option<(Dimension, f64)> {
    UNITS
        .iter()
        .find(|(symbol, _, _)| *symbol == unit)
        .map(|(_, dim, factor)| (*dim, *factor))
}

/// A number with an optional unit, as written in the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Option<String>,
}

impl Quantity {
    pub fn new(value: f64, unit: &str) -> Self {
        Self {
            value,
            unit: Some(unit.to_string()),
        }
    }

    pub fn bare(value: f64) -> Self {
        Self { value, unit: None }
    }

    /// Splits `"0.1GeV"` into `0.1` and `"GeV"`.
    ///
    /// The unit is not checked against the unit table here.
    pub fn parse(text: &str) -> Result<Self, UnitError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(UnitError::Empty);
        }
        let starts_numeric = text
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-'));
        if !starts_numeric {
            return Err(UnitError::InvalidNumber(text.to_string()));
        }

        // Longest numeric prefix followed by an alphabetic unit. "600e" is
        // 600 elementary charges, "1e3eV" is 1000 eV.
        for split in (1..=text.len()).rev() {
            if !text.is_char_boundary(split) {
                continue;
            }
            let (number, unit) = text.split_at(split);
            if !unit.chars().all(|c| c.is_ascii_alphabetic()) {
                continue;
            }
            if let Ok(value) = number.parse::<f64>()
                && value.is_finite()
            {
                let unit = (!unit.is_empty()).then(|| unit.to_string());
                return Ok(Self { value, unit });
            }
        }
        Err(UnitError::InvalidNumber(text.to_string()))
    }

    /// Returns `true` if `text` reads as a number immediately followed by a unit.
    pub fn looks_like_quantity(text: &str) -> bool {
        !text.trim().is_empty()
            && !text.trim().contains(char::is_whitespace)
            && Self::parse(text).is_ok_and(|q| q.unit.is_some())
    }

    /// Converts into internal units.
    ///
    /// A bare number is taken as already expressed in internal units.
    pub fn to_internal(&self, dimension: Dimension) -> Result<f64, UnitError> {
        let Some(unit) = &self.unit else {
            return Ok(self.value);
        };
        let (found, factor) = lookup(unit).ok_or_else(|| UnitError::UnknownUnit(unit.clone()))?;
        if found != dimension {
            return Err(UnitError::WrongDimension {
                unit: unit.clone(),
                expected: dimension,
                found,
            });
        }
        Ok(self.value * factor)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{}{}", self.value, unit),
            None => write!(f, "{}", self.value),
        }
    }
}

/// Parses a single quantity and converts it into internal units.
pub fn parse_quantity(text: &str, dimension: Dimension) -> Result<f64, UnitError> {
    Quantity::parse(text)?.to_internal(dimension)
}

/// Parses whitespace or comma separated quantities of one dimension.
pub fn parse_quantities(text: &str, dimension: Dimension) -> Result<Vec<f64>, UnitError> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| parse_quantity(s, dimension))
        .collect()
}

/// Parses exactly three quantities, e.g. `"0mT 3.8T 0T"`.
pub fn parse_vector3(text: &str, dimension: Dimension) -> Result<[f64; 3], UnitError> {
    let values = parse_quantities(text, dimension)?;
    match values.as_slice() {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => Err(UnitError::WrongCount {
            text: text.to_string(),
            expected: 3,
            found: values.len(),
        }),
    }
}
