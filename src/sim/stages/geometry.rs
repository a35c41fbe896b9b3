use anyhow::{Context, Result, ensure};
use tracing::{debug, info};

use crate::geom::{Rotation, Vector};
use crate::sim::coupling::{DetectorPlacement, Geometry};
use crate::sim::framework::{Bus, Detector, ModuleSetup, SimContext, SimModule};
use crate::units::Dimension;

/// Places every configured detector in the global frame and publishes [`Geometry`].
///
/// Detector entries may set `position` (length vector) and `orientation`
/// (angles around X, Y and Z); both default to `0 0 0`.
pub struct GeometryBuilder {
    world_margin: f64,
}

impl GeometryBuilder {
    pub const NAME: &'static str = "GeometryBuilderGeant4";

    pub fn from_setup(setup: &ModuleSetup) -> Result<Self> {
        let world_margin = setup
            .config
            .quantity_or("world_margin", Dimension::Length, "0mm")?;
        ensure!(world_margin >= 0.0, "world_margin must not be negative");
        Ok(Self { world_margin })
    }

    fn place(detector: &Detector) -> Result<DetectorPlacement> {
        let config = detector.config();
        let position = config.vector3_or("position", Dimension::Length, "0 0 0")?;
        let angles = config.vector3_or("orientation", Dimension::Angle, "0 0 0")?;
        Ok(DetectorPlacement {
            name: detector.name().to_string(),
            model: detector.model().to_string(),
            position: Vector::from_array(position),
            orientation: Rotation::from_xyz(angles)?,
        })
    }
}

impl SimModule for GeometryBuilder {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, ctx: &SimContext, bus: &mut Bus) -> Result<()> {
        ensure!(!ctx.detectors.is_empty(), "no detectors are configured");

        let detectors = ctx
            .detectors
            .iter()
            .map(|d| Self::place(d).with_context(|| format!("detector '{}'", d.name())))
            .collect::<Result<Vec<_>>>()?;
        for d in &detectors {
            debug!(detector = %d.name, position = %d.position, "placed detector");
        }
        info!(detectors = detectors.len(), "built geometry");

        bus.put(Geometry {
            world_margin: self.world_margin,
            detectors,
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
    use crate::sim::stages::testing::{build, detector, state};

    #[test]
    fn test_publishes_placements() -> Result<()> {
        let mut state = state(vec![
            detector("detector1"),
            ConfigEntry::new("detector2")
                .with("type", "cmsp1")
                .with("position", "0 0 50mm")
                .with("orientation", "0 90deg 0"),
        ]);
        let config = ConfigEntry::new("GeometryBuilderGeant4").with("world_margin", "10mm");
        let mut module = build(&state, &config, None, GeometryBuilder::from_setup)?;

        let (ctx, bus) = state.split(None);
        module.init(&ctx, bus)?;

        let geometry = state.bus().get::<Geometry>().unwrap();
        assert_eq!(geometry.world_margin, 10.0);
        assert_eq!(geometry.detectors.len(), 2);
        let d2 = geometry.get("detector2").unwrap();
        assert_eq!(d2.model, "cmsp1");
        assert!(d2.position.is_close(&Vector::new(0., 0., 50.)));
        let rotated = d2.orientation.apply(Vector::new(0., 0., 1.));
        assert!((rotated.dx - 1.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_rejects_bad_position() -> Result<()> {
        let mut state = state(vec![
            ConfigEntry::new("dut")
                .with("type", "test")
                .with("position", "1mm 2mm"),
        ]);
        let config = ConfigEntry::new("GeometryBuilderGeant4");
        let mut module = build(&state, &config, None, GeometryBuilder::from_setup)?;

        let (ctx, bus) = state.split(None);
        let err = module.init(&ctx, bus).unwrap_err();
        assert!(format!("{err:#}").contains("detector 'dut'"));
        Ok(())
    }

    #[test]
    fn test_rejects_negative_margin() {
        let state = state(vec![detector("dut")]);
        let config = ConfigEntry::new("GeometryBuilderGeant4").with("world_margin", "-1mm");
        assert!(build(&state, &config, None, GeometryBuilder::from_setup).is_err());
    }
}
