use anyhow::{Context, Result};
use tracing::info;

use crate::geom::Vector;
use crate::sim::coupling::{Geometry, MagneticField};
use crate::sim::framework::{Bus, ModuleSetup, SimContext, SimModule};
use crate::units::Dimension;

/// Publishes a constant magnetic field and its components in every detector frame.
pub struct MagneticFieldReader {
    field: Vector,
}

impl MagneticFieldReader {
    pub const NAME: &'static str = "MagneticFieldReader";

    pub fn from_setup(setup: &ModuleSetup) -> Result<Self> {
        setup.config.choice_or("model", &["constant"], "constant")?;
        let field = setup
            .config
            .vector3("magnetic_field", Dimension::MagneticField)?;
        Ok(Self {
            field: Vector::from_array(field),
        })
    }
}

impl SimModule for MagneticFieldReader {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, _ctx: &SimContext, bus: &mut Bus) -> Result<()> {
        let geometry = bus
            .get::<Geometry>()
            .context("the geometry has to be built before the magnetic field is read")?;

        let local = geometry
            .detectors
            .iter()
            .map(|d| (d.name.clone(), d.orientation.apply_inverse(self.field)))
            .collect();
        info!(field = %self.field, "set constant magnetic field");

        bus.put(MagneticField {
            global: self.field,
            local,
        });
        Ok(())
    }

    fn step(&mut self, _ctx: &SimContext, _bus: &mut Bus) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigEntry;
    use crate::sim::stages::GeometryBuilder;
    use crate::sim::stages::testing::{build, detector, state};

    fn reader() -> ConfigEntry {
        ConfigEntry::new("MagneticFieldReader")
            .with("model", "constant")
            .with("magnetic_field", "0mT 3.8T 0T")
    }

    #[test]
    fn test_field_in_detector_frames() -> Result<()> {
        let mut state = state(vec![
            detector("detector1"),
            ConfigEntry::new("detector2")
                .with("type", "test")
                .with("orientation", "0 0 90deg"),
        ]);
        let mut geometry = build(
            &state,
            &ConfigEntry::new("GeometryBuilderGeant4"),
            None,
            GeometryBuilder::from_setup,
        )?;
        let mut module = build(&state, &reader(), None, MagneticFieldReader::from_setup)?;

        let (ctx, bus) = state.split(None);
        geometry.init(&ctx, bus)?;
        module.init(&ctx, bus)?;

        let field = state.bus().get::<MagneticField>().unwrap();
        assert!(field.global.is_close(&Vector::new(0., 3.8e-3, 0.)));
        assert!(field.local["detector1"].is_close(&field.global));
        // Rotated by 90 degrees around Z, the global Y axis is the local X axis.
        let local = field.local["detector2"];
        assert!((local.dx - 3.8e-3).abs() < 1e-15);
        assert!(local.dy.abs() < 1e-15);
        Ok(())
    }

    #[test]
    fn test_requires_geometry() -> Result<()> {
        let mut state = state(vec![detector("detector1")]);
        let mut module = build(&state, &reader(), None, MagneticFieldReader::from_setup)?;
        let (ctx, bus) = state.split(None);
        assert!(module.init(&ctx, bus).is_err());
        Ok(())
    }

    #[test]
    fn test_rejects_unknown_model_and_missing_field() {
        let state = state(vec![detector("detector1")]);
        let mesh = reader().with("model", "mesh");
        assert!(build(&state, &mesh, None, MagneticFieldReader::from_setup).is_err());
        let missing = ConfigEntry::new("MagneticFieldReader");
        assert!(build(&state, &missing, None, MagneticFieldReader::from_setup).is_err());
        let wrong_unit = reader().with("magnetic_field", "0 3.8V 0");
        assert!(build(&state, &wrong_unit, None, MagneticFieldReader::from_setup).is_err());
    }
}
