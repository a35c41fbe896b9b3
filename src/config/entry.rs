use thiserror::Error;

use super::SettingValue;
use crate::name::HasName;
use crate::units::{self, Dimension, Quantity, UnitError};

#[derive(Debug, Error, PartialEq)]
pub enum SettingError {
    #[error("[{entry}] missing required setting '{key}'")]
    Missing { entry: String, key: String },

    #[error("[{entry}] setting '{key}' = '{value}': {reason}")]
    Invalid {
        entry: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("[{entry}] setting '{key}' = '{value}'")]
    Unit {
        entry: String,
        key: String,
        value: String,
        #[source]
        source: UnitError,
    },
}

/// A named bag of settings: the global section, one module, or one detector.
///
/// Setting order is kept as inserted. Entries are built with [`ConfigEntry::with`]
/// and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    name: String,
    settings: Vec<(String, SettingValue)>,
}

impl HasName for ConfigEntry {
    fn name(&self) -> &str {
        &self.name
    }
}

impl ConfigEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            settings: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds an entry from key/value pairs.
    pub fn from_pairs<K, V, I>(name: &str, pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<SettingValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        pairs
            .into_iter()
            .fold(Self::new(name), |entry, (k, v)| entry.with(k.as_ref(), v))
    }

    /// Adds (or replaces) a setting and returns the entry.
    pub fn with(mut self, key: &str, value: impl Into<SettingValue>) -> Self {
        self.set(key, value.into());
        self
    }

    /// Replacing keeps the original position of the key. Values are stored
    /// in their [`SettingValue::normalized`] form.
    pub(crate) fn set(&mut self, key: &str, value: SettingValue) {
        let value = value.normalized();
        match self.settings.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.settings.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.settings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.settings.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn require(&self, key: &str) -> Result<&SettingValue, SettingError> {
        self.get(key).ok_or_else(|| SettingError::Missing {
            entry: self.name.clone(),
            key: key.to_string(),
        })
    }

    fn invalid(&self, key: &str, value: &SettingValue, reason: &str) -> SettingError {
        SettingError::Invalid {
            entry: self.name.clone(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn unit_error(&self, key: &str, value: &SettingValue, source: UnitError) -> SettingError {
        SettingError::Unit {
            entry: self.name.clone(),
            key: key.to_string(),
            value: value.to_string(),
            source,
        }
    }

    /// Any value, rendered as text.
    pub fn text(&self, key: &str) -> Result<String, SettingError> {
        self.require(key).map(|v| v.to_string())
    }

    pub fn text_or(&self, key: &str, default: &str) -> String {
        self.get(key)
            .map(|v| v.to_string())
            .unwrap_or_else(|| default.to_string())
    }

    pub fn integer(&self, key: &str) -> Result<i64, SettingError> {
        let value = self.require(key)?;
        match value {
            SettingValue::Integer(i) => Ok(*i),
            SettingValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| self.invalid(key, value, "expected an integer")),
            _ => Err(self.invalid(key, value, "expected an integer")),
        }
    }

    pub fn integer_or(&self, key: &str, default: i64) -> Result<i64, SettingError> {
        if self.has(key) {
            self.integer(key)
        } else {
            Ok(default)
        }
    }

    /// Non-negative integer, e.g. a count or a seed.
    pub fn count_or(&self, key: &str, default: u64) -> Result<u64, SettingError> {
        if !self.has(key) {
            return Ok(default);
        }
        let i = self.integer(key)?;
        u64::try_from(i)
            .map_err(|_| self.invalid(key, &SettingValue::Integer(i), "must not be negative"))
    }

    pub fn float(&self, key: &str) -> Result<f64, SettingError> {
        let value = self.require(key)?;
        match value {
            SettingValue::Float(x) => Ok(*x),
            SettingValue::Integer(i) => Ok(*i as f64),
            SettingValue::Quantity(Quantity { value, unit: None }) => Ok(*value),
            SettingValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.invalid(key, value, "expected a number")),
            _ => Err(self.invalid(key, value, "expected a number")),
        }
    }

    pub fn bool(&self, key: &str) -> Result<bool, SettingError> {
        let value = self.require(key)?;
        match value {
            SettingValue::Bool(b) => Ok(*b),
            SettingValue::Integer(0) => Ok(false),
            SettingValue::Integer(1) => Ok(true),
            SettingValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(self.invalid(key, value, "expected a boolean")),
            },
            _ => Err(self.invalid(key, value, "expected a boolean")),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, SettingError> {
        if self.has(key) {
            self.bool(key)
        } else {
            Ok(default)
        }
    }

    /// Physical quantity converted into internal units.
    pub fn quantity(&self, key: &str, dimension: Dimension) -> Result<f64, SettingError> {
        let value = self.require(key)?;
        let converted = match value {
            SettingValue::Quantity(q) => q.to_internal(dimension),
            SettingValue::Integer(i) => Ok(*i as f64),
            SettingValue::Float(x) => Ok(*x),
            SettingValue::Text(s) => units::parse_quantity(s, dimension),
            SettingValue::Bool(_) => return Err(self.invalid(key, value, "expected a quantity")),
        };
        converted.map_err(|e| self.unit_error(key, value, e))
    }

    /// Like [`ConfigEntry::quantity`], with a default written as configuration text.
    pub fn quantity_or(
        &self,
        key: &str,
        dimension: Dimension,
        default: &str,
    ) -> Result<f64, SettingError> {
        if self.has(key) {
            self.quantity(key, dimension)
        } else {
            units::parse_quantity(default, dimension)
                .map_err(|e| self.unit_error(key, &SettingValue::from(default), e))
        }
    }

    pub fn vector3(&self, key: &str, dimension: Dimension) -> Result<[f64; 3], SettingError> {
        let value = self.require(key)?;
        units::parse_vector3(&value.to_string(), dimension)
            .map_err(|e| self.unit_error(key, value, e))
    }

    pub fn vector3_or(
        &self,
        key: &str,
        dimension: Dimension,
        default: &str,
    ) -> Result<[f64; 3], SettingError> {
        if self.has(key) {
            self.vector3(key, dimension)
        } else {
            units::parse_vector3(default, dimension)
                .map_err(|e| self.unit_error(key, &SettingValue::from(default), e))
        }
    }

    /// Text value restricted to a set of choices.
    pub fn choice_or(
        &self,
        key: &str,
        choices: &[&str],
        default: &str,
    ) -> Result<String, SettingError> {
        let text = self.text_or(key, default);
        if choices.contains(&text.as_str()) {
            Ok(text)
        } else {
            let value = SettingValue::Text(text);
            Err(self.invalid(
                key,
                &value,
                &format!("expected one of: {}", choices.join(", ")),
            ))
        }
    }

    /// Comma or whitespace separated list of names, e.g. `name = "detector1, detector2"`.
    pub fn names(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.to_string()
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}
