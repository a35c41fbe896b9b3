use anyhow::{Context, Result, ensure};
use tracing::debug;

use crate::sim::coupling::{ElectricFields, StageParameters};
use crate::sim::framework::{Bus, ModuleId, ModuleSetup, SimContext, SimModule};
use crate::units::Dimension;

/// Charge propagation settings of one detector.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationConfig {
    /// [K]
    pub temperature: f64,
    pub charge_per_step: u64,
    pub propagate_holes: bool,
    /// [ns]
    pub timestep_min: f64,
    /// [ns]
    pub timestep_max: f64,
    pub output_plots: bool,
}

impl PropagationConfig {
    pub fn from_setup(setup: &ModuleSetup) -> Result<Self> {
        let c = setup.config;
        let temperature = c.quantity_or("temperature", Dimension::Temperature, "293K")?;
        ensure!(temperature > 0.0, "temperature must be positive");
        let charge_per_step = c.count_or("charge_per_step", 10)?;
        ensure!(charge_per_step > 0, "charge_per_step must be at least 1");
        let timestep_min = c.quantity_or("timestep_min", Dimension::Time, "0.5ps")?;
        let timestep_max = c.quantity_or("timestep_max", Dimension::Time, "0.5ns")?;
        ensure!(
            timestep_min > 0.0 && timestep_min <= timestep_max,
            "timesteps must satisfy 0 < timestep_min <= timestep_max"
        );

        Ok(Self {
            temperature,
            charge_per_step,
            propagate_holes: c.bool_or("propagate_holes", false)?,
            timestep_min,
            timestep_max,
            output_plots: c.bool_or("output_plots", false)?,
        })
    }
}

/// Records the propagation parameters of one detector.
///
/// Needs the electric field of its detector.
pub struct GenericPropagation {
    id: ModuleId,
    detector: String,
    config: PropagationConfig,
}

impl GenericPropagation {
    pub const NAME: &'static str = "GenericPropagation";

    pub fn from_setup(setup: &ModuleSetup) -> Result<Self> {
        Ok(Self {
            id: setup.id.clone(),
            detector: setup.require_detector()?.name().to_string(),
            config: PropagationConfig::from_setup(setup)?,
        })
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }
}

impl SimModule for GenericPropagation {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, _ctx: &SimContext, bus: &mut Bus) -> Result<()> {
        let has_field = bus
            .get::<ElectricFields>()
            .is_some_and(|f| f.by_detector.contains_key(&self.detector));
        ensure!(
            has_field,
            "detector '{}' has no electric field to propagate charges in",
            self.detector
        );

        let id = self.id.to_string();
        let c = &self.config;
        let params = bus
            .get_or_default::<StageParameters>()
            .context("stage parameters missing from the bus")?;
        params.record(&id, "temperature", c.temperature);
        params.record(&id, "charge_per_step", c.charge_per_step as f64);
        params.record(&id, "propagate_holes", f64::from(u8::from(c.propagate_holes)));
        params.record(&id, "timestep_min", c.timestep_min);
        params.record(&id, "timestep_max", c.timestep_max);
        debug!(id = %self.id, "recorded propagation parameters");
        Ok(())
    }

    fn step(&mut self, _ctx: &SimContext, _bus: &mut Bus) -> Result<()> {
        Ok(())
    }
}

/// Transfers propagated charges to the pixel implants of one detector.
///
/// Needs [`GenericPropagation`] for the same detector earlier in the sequence.
pub struct SimpleTransfer {
    id: ModuleId,
    detector: String,
    /// [mm]
    max_depth_distance: f64,
}

impl SimpleTransfer {
    pub const NAME: &'static str = "SimpleTransfer";

    pub fn from_setup(setup: &ModuleSetup) -> Result<Self> {
        let max_depth_distance = setup
            .config
            .quantity_or("max_depth_distance", Dimension::Length, "5um")?;
        ensure!(
            max_depth_distance >= 0.0,
            "max_depth_distance must not be negative"
        );
        Ok(Self {
            id: setup.id.clone(),
            detector: setup.require_detector()?.name().to_string(),
            max_depth_distance,
        })
    }
}

impl SimModule for SimpleTransfer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, _ctx: &SimContext, bus: &mut Bus) -> Result<()> {
        let upstream =
            ModuleId::for_detector(GenericPropagation::NAME, &self.detector).to_string();
        let params = bus
            .get_or_default::<StageParameters>()
            .context("stage parameters missing from the bus")?;
        ensure!(
            params.contains(&upstream),
            "detector '{}' has no propagated charges to transfer",
            self.detector
        );
        params.record(
            &self.id.to_string(),
            "max_depth_distance",
            self.max_depth_distance,
        );
        Ok(())
    }

    fn step(&mut self, _ctx: &SimContext, _bus: &mut Bus) -> Result<()> {
        Ok(())
    }
}
