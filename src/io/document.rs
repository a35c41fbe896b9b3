//! TOML form of a [`ConfigManager`].
//!
//! ```toml
//! ignore = ["Ignore"]
//!
//! [global]
//! name = "Allpix"
//! [global.settings]
//! number_of_events = 25
//!
//! [[modules]]
//! name = "MagneticFieldReader"
//! [modules.settings]
//! model = "constant"
//! magnetic_field = "0mT 3.8T 0T"
//!
//! [[detectors]]
//! name = "detector1"
//! [detectors.settings]
//! type = "cmsp1"
//! ```
//!
//! Setting order inside an entry is kept. Strings of the form `<number><unit>`
//! are read as quantities; arrays of scalars are joined into one
//! comma-separated text value.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::config::{ConfigEntry, ConfigError, ConfigManager, SettingValue};

#[derive(Debug, Serialize, Deserialize)]
struct EntryDocument {
    name: String,
    #[serde(default)]
    settings: Table,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ignore: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    global: Option<EntryDocument>,
    #[serde(default)]
    modules: Vec<EntryDocument>,
    #[serde(default)]
    detectors: Vec<EntryDocument>,
}

fn value_to_setting(entry: &str, key: &str, value: &Value) -> Result<SettingValue, ConfigError> {
    let setting = match value {
        Value::String(s) => SettingValue::from_text(s),
        Value::Integer(i) => SettingValue::Integer(*i),
        Value::Float(x) => SettingValue::Float(*x),
        Value::Boolean(b) => SettingValue::Bool(*b),
        Value::Array(items) => {
            let parts = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Integer(_) | Value::Float(_) | Value::Boolean(_) => Ok(item.to_string()),
                    _ => Err(unsupported(entry, key, value)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            SettingValue::from_text(&parts.join(", "))
        }
        Value::Datetime(_) | Value::Table(_) => return Err(unsupported(entry, key, value)),
    };
    Ok(setting)
}

fn unsupported(entry: &str, key: &str, value: &Value) -> ConfigError {
    ConfigError::MalformedSetting(crate::config::SettingError::Invalid {
        entry: entry.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: format!("{} values are not supported", value.type_str()),
    })
}

fn setting_to_value(setting: &SettingValue) -> Value {
    match setting {
        SettingValue::Text(s) => Value::String(s.clone()),
        SettingValue::Integer(i) => Value::Integer(*i),
        SettingValue::Float(x) => Value::Float(*x),
        SettingValue::Bool(b) => Value::Boolean(*b),
        SettingValue::Quantity(q) => Value::String(q.to_string()),
    }
}

fn entry_from_document(doc: &EntryDocument) -> Result<ConfigEntry, ConfigError> {
    let settings = doc
        .settings
        .iter()
        .map(|(key, value)| Ok((key, value_to_setting(&doc.name, key, value)?)))
        .collect::<Result<Vec<_>, ConfigError>>()?;
    Ok(ConfigEntry::from_pairs(&doc.name, settings))
}

fn entry_to_document(entry: &ConfigEntry) -> EntryDocument {
    EntryDocument {
        name: entry.name().to_string(),
        settings: entry
            .iter()
            .map(|(k, v)| (k.to_string(), setting_to_value(v)))
            .collect(),
    }
}

/// Parses a configuration document.
pub fn from_toml_str(text: &str) -> Result<ConfigManager, ConfigError> {
    let doc: ConfigDocument = toml::from_str(text)?;

    let mut manager = ConfigManager::new();
    if let Some(ignore) = doc.ignore {
        manager.set_ignore_names(ignore);
    }
    if let Some(global) = &doc.global {
        manager.set_global(entry_from_document(global)?);
    }
    manager.set_modules(
        doc.modules
            .iter()
            .map(entry_from_document)
            .collect::<Result<_, _>>()?,
    );
    manager.set_detectors(
        doc.detectors
            .iter()
            .map(entry_from_document)
            .collect::<Result<_, _>>()?,
    );
    Ok(manager)
}

/// Serializes a manager. Parsing the result yields an equal manager.
///
/// Entries hold normalized values (see [`SettingValue::normalized`]), which
/// is what makes the text form lossless.
pub fn to_toml_string(manager: &ConfigManager) -> Result<String, ConfigError> {
    let doc = ConfigDocument {
        ignore: Some(manager.ignore_names().to_vec()),
        global: manager.global_config().map(entry_to_document),
        modules: manager.modules().iter().map(entry_to_document).collect(),
        detectors: manager.detectors().iter().map(entry_to_document).collect(),
    };
    Ok(toml::to_string(&doc)?)
}

pub fn read_config(path: &Path) -> Result<ConfigManager, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    from_toml_str(&text)
}

pub fn write_config(path: &Path, manager: &ConfigManager) -> Result<(), ConfigError> {
    let text = to_toml_string(manager)?;
    fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Quantity;

    const DOCUMENT: &str = r#"
[global]
name = "Allpix"
[global.settings]
number_of_events = 25
log_level = "WARNING"

[[modules]]
name = "GeometryBuilderGeant4"

[[modules]]
name = "ElectricFieldReader"
[modules.settings]
model = "linear"
voltage = "-150V"
name = ["detector1", "detector2"]

[[detectors]]
name = "detector2"
[detectors.settings]
type = "cmsp1"
position = "0 0 50mm"

[[detectors]]
name = "detector1"
[detectors.settings]
type = "mimosa26"
"#;

    #[test]
    fn test_parse_document() -> Result<(), ConfigError> {
        let manager = from_toml_str(DOCUMENT)?;
        let global = manager.global_config().unwrap();
        assert_eq!(global.name(), "Allpix");
        assert_eq!(global.get("number_of_events"), Some(&SettingValue::Integer(25)));

        let names: Vec<&str> = manager.modules().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["GeometryBuilderGeant4", "ElectricFieldReader"]);
        let reader = &manager.modules()[1];
        assert_eq!(
            reader.get("voltage"),
            Some(&SettingValue::Quantity(Quantity::new(-150.0, "V")))
        );
        assert_eq!(reader.names("name"), vec!["detector1", "detector2"]);
        let keys: Vec<&str> = reader.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["model", "voltage", "name"]);

        let detectors: Vec<&str> = manager.detectors().iter().map(|d| d.name()).collect();
        assert_eq!(detectors, vec!["detector1", "detector2"]);
        assert_eq!(manager.ignore_names(), ["Ignore"]);
        Ok(())
    }

    #[test]
    fn test_round_trip() -> Result<(), ConfigError> {
        let manager = from_toml_str(DOCUMENT)?;
        let text = to_toml_string(&manager)?;
        assert_eq!(from_toml_str(&text)?, manager);
        Ok(())
    }

    #[test]
    fn test_round_trip_keeps_every_kind_of_value() -> Result<(), ConfigError> {
        let values = [
            SettingValue::Text("e-".into()),
            SettingValue::Text("2mm".into()),
            SettingValue::Text(" 3.8T".into()),
            SettingValue::Text("0mT 3.8T 0T".into()),
            SettingValue::Text("1".into()),
            SettingValue::Text(String::new()),
            SettingValue::Integer(i64::MIN),
            SettingValue::Integer(0),
            SettingValue::Float(0.1),
            SettingValue::Float(-2.5e-7),
            SettingValue::Float(f64::INFINITY),
            SettingValue::Float(f64::NAN),
            SettingValue::Bool(true),
            SettingValue::Quantity(Quantity::new(0.1, "GeV")),
            SettingValue::Quantity(Quantity::new(-0.0, "mm")),
            SettingValue::Quantity(Quantity::bare(2.5)),
            SettingValue::Quantity(Quantity::new(2.0, "V/cm")),
        ];
        let global = values
            .iter()
            .enumerate()
            .fold(ConfigEntry::new("Allpix"), |entry, (i, v)| {
                entry.with(&format!("key{i}"), v.clone())
            });
        let mut manager = ConfigManager::new();
        manager.set_global(global.clone());
        manager.set_modules(vec![global]);

        let back = from_toml_str(&to_toml_string(&manager)?)?;
        assert_eq!(back, manager);
        assert_eq!(
            back.global_config().unwrap().get("key1"),
            Some(&SettingValue::Quantity(Quantity::new(2.0, "mm")))
        );
        Ok(())
    }

    #[test]
    fn test_round_trip_through_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        let mut manager = from_toml_str(DOCUMENT)?;
        manager.set_ignore_names(vec!["Ignore".into(), "Skip".into()]);
        write_config(&path, &manager)?;
        assert_eq!(read_config(&path)?, manager);
        Ok(())
    }

    #[test]
    fn test_errors() {
        assert!(matches!(from_toml_str("[global"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            from_toml_str("[[modules]]\nname = \"A\"\n[modules.settings]\nwhen = 1979-05-27\n"),
            Err(ConfigError::MalformedSetting(_))
        ));
        assert!(matches!(
            read_config(Path::new("/nonexistent/config.toml")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_missing_global_is_left_to_validation() -> Result<(), ConfigError> {
        let manager = from_toml_str("[[modules]]\nname = \"A\"\n")?;
        assert!(manager.global_config().is_none());
        assert_eq!(manager.modules().len(), 1);
        Ok(())
    }
}
