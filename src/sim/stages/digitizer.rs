use anyhow::{Context, Result, ensure};
use tracing::debug;

use crate::sim::coupling::StageParameters;
use crate::sim::framework::{Bus, ModuleId, ModuleSetup, SimContext, SimModule};
use crate::units::Dimension;

/// Front-end electronics settings of one detector.
pub struct DefaultDigitizer {
    id: ModuleId,
    /// [e]
    threshold: f64,
    /// [e]
    electronics_noise: f64,
    /// Bits of the charge-to-digital converter.
    qdc_resolution: u64,
}

impl DefaultDigitizer {
    pub const NAME: &'static str = "DefaultDigitizer";

    pub fn from_setup(setup: &ModuleSetup) -> Result<Self> {
        setup.require_detector()?;
        let c = setup.config;
        let threshold = c.quantity_or("threshold", Dimension::Charge, "600e")?;
        let electronics_noise = c.quantity_or("electronics_noise", Dimension::Charge, "110e")?;
        ensure!(electronics_noise >= 0.0, "electronics_noise must not be negative");
        let qdc_resolution = c.count_or("qdc_resolution", 8)?;
        ensure!(
            (1..=32).contains(&qdc_resolution),
            "qdc_resolution must be between 1 and 32 bits"
        );
        Ok(Self {
            id: setup.id.clone(),
            threshold,
            electronics_noise,
            qdc_resolution,
        })
    }
}

impl SimModule for DefaultDigitizer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, _ctx: &SimContext, bus: &mut Bus) -> Result<()> {
        let id = self.id.to_string();
        let params = bus
            .get_or_default::<StageParameters>()
            .context("stage parameters missing from the bus")?;
        params.record(&id, "threshold", self.threshold);
        params.record(&id, "electronics_noise", self.electronics_noise);
        params.record(&id, "qdc_resolution", self.qdc_resolution as f64);
        debug!(id = %self.id, threshold_e = self.threshold, "configured digitizer");
        Ok(())
    }

    fn step(&mut self, _ctx: &SimContext, _bus: &mut Bus) -> Result<()> {
        Ok(())
    }
}
