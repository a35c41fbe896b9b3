use crate::config::{ConfigEntry, SettingError};
use crate::name::HasName;

/// Run-time view of one detector entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Detector {
    name: String,
    model: String,
    config: ConfigEntry,
}

impl HasName for Detector {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Detector {
    /// The `type` setting names the detector model.
    pub fn from_config(config: &ConfigEntry) -> Result<Self, SettingError> {
        Ok(Self {
            name: config.name().to_string(),
            model: config.text("type")?,
            config: config.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn config(&self) -> &ConfigEntry {
        &self.config
    }
}

/// Detectors of one run, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorTable {
    detectors: Vec<Detector>,
}

impl DetectorTable {
    pub fn from_configs(configs: &[ConfigEntry]) -> Result<Self, SettingError> {
        let mut detectors = configs
            .iter()
            .map(Detector::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        crate::name::SortByName::sort_by_name(detectors.as_mut_slice());
        Ok(Self { detectors })
    }

    pub fn get(&self, name: &str) -> Option<&Detector> {
        self.detectors.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Detector> {
        self.detectors.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_and_searchable() {
        let table = DetectorTable::from_configs(&[
            ConfigEntry::new("telescope").with("type", "mimosa26"),
            ConfigEntry::new("dut").with("type", "cmsp1"),
        ])
        .unwrap();
        assert_eq!(table.names(), vec!["dut", "telescope"]);
        assert_eq!(table.get("dut").unwrap().model(), "cmsp1");
        assert!(table.get("missing").is_none());
    }

    #[test]
    fn test_detector_requires_type() {
        assert!(DetectorTable::from_configs(&[ConfigEntry::new("dut")]).is_err());
    }
}
