use std::fmt;

use crate::units::Quantity;

/// A single setting value.
///
/// Values are stored as written; the consuming module decides how to read
/// them (see the typed getters on [`super::ConfigEntry`]).
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Quantity(Quantity),
}

impl SettingValue {
    /// Reads a string from a configuration document.
    ///
    /// A single number immediately followed by a unit (`"0.1GeV"`) becomes a
    /// [`SettingValue::Quantity`]; everything else stays text.
    pub fn from_text(text: &str) -> Self {
        if Quantity::looks_like_quantity(text)
            && let Ok(q) = Quantity::parse(text)
        {
            return Self::Quantity(q);
        }
        Self::Text(text.to_string())
    }

    /// Reads a value given on the command line, where nothing is quoted.
    pub fn parse_option(text: &str) -> Self {
        let text = text.trim();
        match text {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(i) = text.parse::<i64>() {
            return Self::Integer(i);
        }
        if let Ok(f) = text.parse::<f64>()
            && f.is_finite()
        {
            return Self::Float(f);
        }
        Self::from_text(text)
    }

    /// The form a configuration document reads this value back as.
    ///
    /// Text that reads as a quantity becomes a quantity, a quantity whose
    /// text does not becomes text. Non-finite floats are kept as text.
    pub fn normalized(self) -> Self {
        match self {
            Self::Text(s) => Self::from_text(&s),
            Self::Quantity(q) => Self::from_text(&q.to_string()),
            Self::Float(x) if !x.is_finite() => Self::Text(x.to_string()),
            other => other,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Text(_) => "text",
            SettingValue::Integer(_) => "integer",
            SettingValue::Float(_) => "float",
            SettingValue::Bool(_) => "bool",
            SettingValue::Quantity(_) => "quantity",
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Text(s) => f.write_str(s),
            SettingValue::Integer(i) => write!(f, "{i}"),
            SettingValue::Float(x) => write!(f, "{x}"),
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Quantity(q) => write!(f, "{q}"),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::from_text(value)
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::from_text(&value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for SettingValue {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Quantity> for SettingValue {
    fn from(value: Quantity) -> Self {
        Self::Quantity(value)
    }
}
