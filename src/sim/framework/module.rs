use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{Bus, Detector, SimContext};
use crate::config::ConfigEntry;

/// A composable pipeline module.
///
/// Modules are constructed by a registered factory from their configuration
/// entry, then driven through `init`, one `step` per event, and `finalize`.
/// Communication with other modules is done via the [`Bus`].
pub trait SimModule {
    /// Human-readable identifier for debugging / telemetry.
    fn name(&self) -> &str;

    /// Optional one-time initialization hook.
    fn init(&mut self, _ctx: &SimContext, _bus: &mut Bus) -> Result<()> {
        Ok(())
    }

    /// Processes one event.
    fn step(&mut self, ctx: &SimContext, bus: &mut Bus) -> Result<()>;

    /// Optional hook after the last event, e.g. to write output artifacts.
    fn finalize(&mut self, _ctx: &SimContext, _bus: &mut Bus) -> Result<()> {
        Ok(())
    }
}

/// How many instances a module entry produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleKind {
    /// One instance per run.
    Unique,
    /// One instance per targeted detector.
    Detector,
}

/// Identifies a module instance: `Name` or `Name:detector`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleId {
    pub name: String,
    pub detector: Option<String>,
}

impl ModuleId {
    pub fn unique(name: &str) -> Self {
        Self {
            name: name.to_string(),
            detector: None,
        }
    }

    pub fn for_detector(name: &str, detector: &str) -> Self {
        Self {
            name: name.to_string(),
            detector: Some(detector.to_string()),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detector {
            Some(detector) => write!(f, "{}:{}", self.name, detector),
            None => f.write_str(&self.name),
        }
    }
}

/// Everything a factory gets to construct one module instance.
pub struct ModuleSetup<'a> {
    pub id: &'a ModuleId,
    pub config: &'a ConfigEntry,
    pub global: &'a ConfigEntry,
    /// Set for detector modules.
    pub detector: Option<&'a Detector>,
    /// Seed for the instance's own random generator.
    pub seed: u64,
}

impl ModuleSetup<'_> {
    /// The detector of a detector module.
    pub fn require_detector(&self) -> Result<&Detector> {
        self.detector
            .ok_or_else(|| anyhow::anyhow!("{} must be instantiated for a detector", self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UID;
    use crate::sim::framework::DetectorTable;

    struct Dummy;
    impl SimModule for Dummy {
        fn name(&self) -> &str {
            "dummy"
        }

        fn step(&mut self, _ctx: &SimContext, bus: &mut Bus) -> Result<()> {
            bus.put(42_u32);
            Ok(())
        }
    }

    #[test]
    fn test_default_hooks_are_ok() {
        let global = ConfigEntry::new("Allpix");
        let detectors = DetectorTable::default();
        let run_id = UID::new();
        let ctx = SimContext::new(&global, &detectors, &run_id);

        let mut bus = Bus::new();
        let mut m = Dummy;

        m.init(&ctx, &mut bus).unwrap();
        m.step(&ctx, &mut bus).unwrap();
        m.finalize(&ctx, &mut bus).unwrap();
        assert_eq!(bus.get::<u32>(), Some(&42));
    }

    #[test]
    fn test_module_id_display() {
        assert_eq!(ModuleId::unique("DepositionGeant4").to_string(), "DepositionGeant4");
        assert_eq!(
            ModuleId::for_detector("DetectorHistogrammer", "detector2").to_string(),
            "DetectorHistogrammer:detector2"
        );
    }

    #[test]
    fn test_require_detector() {
        let id = ModuleId::unique("SimpleTransfer");
        let config = ConfigEntry::new("SimpleTransfer");
        let setup = ModuleSetup {
            id: &id,
            config: &config,
            global: &config,
            detector: None,
            seed: 0,
        };
        assert!(setup.require_detector().is_err());
    }
}
