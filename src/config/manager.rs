use std::collections::{HashMap, HashSet};

use super::{ConfigEntry, ConfigError, SettingError, SettingValue};
use crate::name::SortByName;
use crate::sim::framework::{ModuleId, ModuleKind, ModuleRegistry};

/// Events simulated when the global section does not say otherwise.
pub const DEFAULT_NUMBER_OF_EVENTS: u64 = 1;
/// Seed of the core random generator when `random_seed` is not set.
pub const DEFAULT_RANDOM_SEED: u64 = 42;
/// Module entries with these names are skipped.
pub const DEFAULT_IGNORE_NAMES: &[&str] = &["Ignore"];

/// One module instance the executor will construct.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedInstance {
    /// Position of the originating entry in the configured module sequence.
    pub index: usize,
    pub id: ModuleId,
    pub kind: ModuleKind,
}

/// Aggregates the global, module and detector configuration of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigManager {
    global: Option<ConfigEntry>,
    modules: Vec<ConfigEntry>,
    detectors: Vec<ConfigEntry>,
    ignore: Vec<String>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            global: None,
            modules: vec![],
            detectors: vec![],
            ignore: DEFAULT_IGNORE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn set_global(&mut self, global: ConfigEntry) {
        self.global = Some(global);
    }

    /// Sequence order is execution order.
    pub fn set_modules(&mut self, modules: Vec<ConfigEntry>) {
        self.modules = modules;
    }

    /// Detectors are kept sorted by name so that everything iterating over
    /// them is reproducible.
    pub fn set_detectors(&mut self, mut detectors: Vec<ConfigEntry>) {
        detectors.as_mut_slice().sort_by_name();
        self.detectors = detectors;
    }

    pub fn set_ignore_names(&mut self, names: Vec<String>) {
        self.ignore = names;
    }

    pub fn global_config(&self) -> Option<&ConfigEntry> {
        self.global.as_ref()
    }

    pub fn modules(&self) -> &[ConfigEntry] {
        &self.modules
    }

    pub fn detectors(&self) -> &[ConfigEntry] {
        &self.detectors
    }

    pub fn ignore_names(&self) -> &[String] {
        &self.ignore
    }

    /// First module entry with the given name.
    pub fn module_config(&self, name: &str) -> Option<&ConfigEntry> {
        self.modules.iter().find(|m| m.name() == name)
    }

    pub fn detector_config(&self, name: &str) -> Option<&ConfigEntry> {
        self.detectors.iter().find(|d| d.name() == name)
    }

    /// Module entries that take part in the run, with their sequence index.
    pub fn active_modules(&self) -> impl Iterator<Item = (usize, &ConfigEntry)> {
        self.modules
            .iter()
            .enumerate()
            .filter(|(_, m)| !self.ignore.iter().any(|i| i == m.name()))
    }

    /// Applies `Module.key=value` to every entry of `Module`.
    ///
    /// Without a module prefix (`key=value`) the global section is changed.
    pub fn apply_module_option(&mut self, option: &str) -> Result<(), ConfigError> {
        let (target, key, value) = split_option(option)?;
        match target {
            None => {
                let global = self.global.as_mut().ok_or(ConfigError::MissingGlobal)?;
                global.set(key, value);
            }
            Some(module) => {
                let mut matched = false;
                for entry in self.modules.iter_mut().filter(|m| m.name() == module) {
                    entry.set(key, value.clone());
                    matched = true;
                }
                if !matched {
                    return Err(ConfigError::MalformedOption {
                        option: option.to_string(),
                        reason: format!("no module named '{module}' is configured"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Applies `detector.key=value` to the named detector.
    pub fn apply_detector_option(&mut self, option: &str) -> Result<(), ConfigError> {
        let (target, key, value) = split_option(option)?;
        let Some(detector) = target else {
            return Err(ConfigError::MalformedOption {
                option: option.to_string(),
                reason: "expected <detector>.<key>=<value>".to_string(),
            });
        };
        let entry = self
            .detectors
            .iter_mut()
            .find(|d| d.name() == detector)
            .ok_or_else(|| ConfigError::NoSuchDetector(detector.to_string()))?;
        entry.set(key, value);
        Ok(())
    }

    /// Checks that the configuration can run with the given registry.
    pub fn validate(&self, registry: &ModuleRegistry) -> Result<(), ConfigError> {
        self.plan(registry).map(|_| ())
    }

    /// Validates and expands module entries into the instances to construct.
    ///
    /// Unique modules yield one instance. Detector modules yield one instance
    /// per targeted detector: a `name` setting targets the listed detectors, a
    /// `type` setting targets detectors of those models, otherwise all
    /// detectors. For a given module and detector a `name` instance overrides a
    /// `type` instance, which overrides a generic one.
    pub fn plan(&self, registry: &ModuleRegistry) -> Result<Vec<PlannedInstance>, ConfigError> {
        let global = self.global.as_ref().ok_or(ConfigError::MissingGlobal)?;
        global.count_or("number_of_events", DEFAULT_NUMBER_OF_EVENTS)?;
        global.count_or("random_seed", DEFAULT_RANDOM_SEED)?;

        let mut detector_names = HashSet::new();
        for detector in &self.detectors {
            if !detector_names.insert(detector.name()) {
                return Err(ConfigError::DuplicateDetector(detector.name().to_string()));
            }
            detector.text("type")?;
        }

        if self.active_modules().next().is_none() {
            return Err(ConfigError::NoModules);
        }

        let mut planned = vec![];
        let mut unique_seen = HashSet::new();
        // (module, detector) -> (priority, entry index)
        let mut claims: HashMap<(String, String), (u8, usize)> = HashMap::new();

        for (index, entry) in self.active_modules() {
            let descriptor = registry
                .resolve(entry.name())
                .map_err(|source| ConfigError::UnknownModule { index, source })?;

            let named = entry.names("name");
            if let Some(missing) = named.iter().find(|n| !detector_names.contains(n.as_str())) {
                return Err(ConfigError::UnknownDetector {
                    index,
                    module: entry.name().to_string(),
                    detector: missing.clone(),
                });
            }
            let types = entry.names("type");
            if !named.is_empty() && !types.is_empty() {
                return Err(SettingError::Invalid {
                    entry: entry.name().to_string(),
                    key: "type".to_string(),
                    value: types.join(", "),
                    reason: "cannot be combined with 'name'".to_string(),
                }
                .into());
            }

            match descriptor.kind() {
                ModuleKind::Unique => {
                    if !unique_seen.insert(entry.name()) {
                        return Err(ConfigError::DuplicateModule {
                            index,
                            identifier: entry.name().to_string(),
                        });
                    }
                    planned.push(PlannedInstance {
                        index,
                        id: ModuleId::unique(entry.name()),
                        kind: ModuleKind::Unique,
                    });
                }
                ModuleKind::Detector => {
                    let priority = if !named.is_empty() {
                        2
                    } else if !types.is_empty() {
                        1
                    } else {
                        0
                    };
                    for detector in &self.detectors {
                        let targeted = match priority {
                            2 => named.iter().any(|n| n == detector.name()),
                            1 => types.iter().any(|t| *t == detector.text_or("type", "")),
                            _ => true,
                        };
                        if !targeted {
                            continue;
                        }
                        let id = ModuleId::for_detector(entry.name(), detector.name());
                        let key = (entry.name().to_string(), detector.name().to_string());
                        match claims.get(&key) {
                            Some((p, _)) if *p == priority => {
                                return Err(ConfigError::DuplicateModule {
                                    index,
                                    identifier: id.to_string(),
                                });
                            }
                            Some((p, _)) if *p > priority => continue,
                            _ => {
                                claims.insert(key, (priority, index));
                            }
                        }
                        planned.push(PlannedInstance {
                            index,
                            id,
                            kind: ModuleKind::Detector,
                        });
                    }
                }
            }
        }

        // Drop detector instances overridden by a more specific entry.
        planned.retain(|p| match &p.id.detector {
            Some(detector) => {
                claims.get(&(p.id.name.clone(), detector.clone())).map(|(_, i)| *i)
                    == Some(p.index)
            }
            None => true,
        });

        Ok(planned)
    }
}

/// Splits `target.key=value` (the target is optional).
fn split_option(option: &str) -> Result<(Option<&str>, &str, SettingValue), ConfigError> {
    let malformed = |reason: &str| ConfigError::MalformedOption {
        option: option.to_string(),
        reason: reason.to_string(),
    };
    let (lhs, value) = option
        .split_once('=')
        .ok_or_else(|| malformed("expected key=value"))?;
    let (target, key) = match lhs.trim().split_once('.') {
        Some((target, key)) => (Some(target.trim()), key.trim()),
        None => (None, lhs.trim()),
    };
    if key.is_empty() || target.is_some_and(str::is_empty) {
        return Err(malformed("empty key or target"));
    }
    Ok((target, key, SettingValue::parse_option(value)))
}
