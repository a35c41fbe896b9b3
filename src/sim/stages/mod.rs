//! Built-in configuration stages.
//!
//! Each stage validates its settings when it is constructed, checks for the
//! payloads it depends on during `init` and publishes its own results on the
//! bus. None of them does any transport physics.

use anyhow::Result;

use crate::sim::framework::{ModuleKind, ModuleRegistry, ModuleSetup, SimModule};

pub mod deposition;
pub mod digitizer;
pub mod electric;
pub mod geometry;
pub mod histogram;
pub mod magnetic;
pub mod propagation;

pub use deposition::DepositionGeant4;
pub use digitizer::DefaultDigitizer;
pub use electric::ElectricFieldReader;
pub use geometry::GeometryBuilder;
pub use histogram::{DetectorHistogrammer, Histogram2D};
pub use magnetic::MagneticFieldReader;
pub use propagation::{GenericPropagation, SimpleTransfer};

fn boxed<M, F>(build: F) -> impl Fn(&ModuleSetup) -> Result<Box<dyn SimModule>> + 'static
where
    M: SimModule + 'static,
    F: Fn(&ModuleSetup) -> Result<M> + 'static,
{
    move |setup: &ModuleSetup| -> Result<Box<dyn SimModule>> { Ok(Box::new(build(setup)?)) }
}

/// Registers every built-in stage under its configuration name.
pub fn register_builtins(registry: &mut ModuleRegistry) {
    use ModuleKind::{Detector, Unique};

    registry.register(
        GeometryBuilder::NAME,
        Unique,
        boxed(GeometryBuilder::from_setup),
    );
    registry.register(
        MagneticFieldReader::NAME,
        Unique,
        boxed(MagneticFieldReader::from_setup),
    );
    registry.register(
        ElectricFieldReader::NAME,
        Detector,
        boxed(ElectricFieldReader::from_setup),
    );
    registry.register(
        DepositionGeant4::NAME,
        Unique,
        boxed(DepositionGeant4::from_setup),
    );
    registry.register(
        GenericPropagation::NAME,
        Detector,
        boxed(GenericPropagation::from_setup),
    );
    registry.register(
        SimpleTransfer::NAME,
        Detector,
        boxed(SimpleTransfer::from_setup),
    );
    registry.register(
        DefaultDigitizer::NAME,
        Detector,
        boxed(DefaultDigitizer::from_setup),
    );
    registry.register(
        DetectorHistogrammer::NAME,
        Detector,
        boxed(DetectorHistogrammer::from_setup),
    );
}

#[cfg(test)]
pub(crate) mod testing {
    use anyhow::Result;

    use crate::config::ConfigEntry;
    use crate::sim::framework::{DetectorTable, ModuleId, ModuleSetup, RunState};

    pub fn detector(name: &str) -> ConfigEntry {
        ConfigEntry::new(name)
            .with("type", "test")
            .with("position", "0 0 0")
            .with("orientation", "0 0 0")
    }

    pub fn state(detectors: Vec<ConfigEntry>) -> RunState {
        state_with_global(ConfigEntry::new("Allpix"), detectors)
    }

    pub fn state_with_global(global: ConfigEntry, detectors: Vec<ConfigEntry>) -> RunState {
        let table = DetectorTable::from_configs(&detectors).unwrap();
        RunState::new(global, table, 1)
    }

    /// Constructs a stage the way the executor does.
    pub fn build<M>(
        state: &RunState,
        config: &ConfigEntry,
        detector: Option<&str>,
        create: impl Fn(&ModuleSetup) -> Result<M>,
    ) -> Result<M> {
        let id = match detector {
            Some(d) => ModuleId::for_detector(config.name(), d),
            None => ModuleId::unique(config.name()),
        };
        let setup = ModuleSetup {
            id: &id,
            config,
            global: state.global(),
            detector: detector.and_then(|d| state.detectors().get(d)),
            seed: 7,
        };
        create(&setup)
    }
}
