use anyhow::{Context, Result, ensure};
use tracing::info;

use crate::sim::coupling::{ElectricField, ElectricFieldModel, ElectricFields, Geometry};
use crate::sim::framework::{Bus, ModuleSetup, SimContext, SimModule};
use crate::units::Dimension;

/// Sets the electric field configuration of one detector.
///
/// `model = "constant"` applies `voltage` across the whole sensor.
/// `model = "linear"` additionally reads an optional `bias_voltage`, which
/// must not exceed `voltage` in magnitude.
pub struct ElectricFieldReader {
    detector: String,
    field: ElectricField,
}

impl ElectricFieldReader {
    pub const NAME: &'static str = "ElectricFieldReader";

    pub fn from_setup(setup: &ModuleSetup) -> Result<Self> {
        let detector = setup.require_detector()?.name().to_string();
        let config = setup.config;

        let model = config.choice_or("model", &["constant", "linear"], "linear")?;
        let model = match model.as_str() {
            "constant" => ElectricFieldModel::Constant,
            _ => ElectricFieldModel::Linear,
        };
        let voltage = config.quantity("voltage", Dimension::Voltage)?;
        let bias_voltage = match (model, config.has("bias_voltage")) {
            (ElectricFieldModel::Linear, true) => {
                let bias = config.quantity("bias_voltage", Dimension::Voltage)?;
                ensure!(
                    bias.abs() <= voltage.abs(),
                    "bias_voltage must not exceed voltage in magnitude"
                );
                Some(bias)
            }
            _ => None,
        };

        Ok(Self {
            detector,
            field: ElectricField {
                model,
                voltage,
                bias_voltage,
            },
        })
    }
}

impl SimModule for ElectricFieldReader {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, _ctx: &SimContext, bus: &mut Bus) -> Result<()> {
        let placed = bus
            .get::<Geometry>()
            .is_some_and(|g| g.get(&self.detector).is_some());
        ensure!(
            placed,
            "detector '{}' has to be placed before its electric field is set",
            self.detector
        );

        info!(
            detector = %self.detector,
            model = ?self.field.model,
            voltage_mv = self.field.voltage,
            "set electric field"
        );
        bus.get_or_default::<ElectricFields>()
            .context("electric fields missing from the bus")?
            .by_detector
            .insert(self.detector.clone(), self.field.clone());
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

    #[test]
    fn test_fields_per_detector() -> Result<()> {
        let mut state = state(vec![detector("detector1"), detector("detector2")]);
        let mut geometry = build(
            &state,
            &ConfigEntry::new("GeometryBuilderGeant4"),
            None,
            GeometryBuilder::from_setup,
        )?;
        let linear = ConfigEntry::new("ElectricFieldReader")
            .with("model", "linear")
            .with("voltage", "-150V")
            .with("bias_voltage", "-50V");
        let constant = ConfigEntry::new("ElectricFieldReader")
            .with("model", "constant")
            .with("voltage", "100V");
        let create = ElectricFieldReader::from_setup;
        let mut first = build(&state, &linear, Some("detector1"), create)?;
        let mut second = build(&state, &constant, Some("detector2"), create)?;

        let (ctx, bus) = state.split(None);
        geometry.init(&ctx, bus)?;
        first.init(&ctx, bus)?;
        second.init(&ctx, bus)?;

        let fields = state.bus().get::<ElectricFields>().unwrap();
        let d1 = &fields.by_detector["detector1"];
        assert_eq!(d1.model, ElectricFieldModel::Linear);
        assert!((d1.voltage + 1.5e-4).abs() < 1e-15);
        assert!(d1.bias_voltage.is_some());
        let d2 = &fields.by_detector["detector2"];
        assert_eq!(d2.model, ElectricFieldModel::Constant);
        assert_eq!(d2.bias_voltage, None);
        Ok(())
    }

    #[test]
    fn test_validation() {
        let state = state(vec![detector("detector1")]);
        let create = ElectricFieldReader::from_setup;
        let base = ConfigEntry::new("ElectricFieldReader").with("voltage", "-150V");

        // Detector modules need a detector.
        assert!(build(&state, &base, None, create).is_err());
        let no_voltage = ConfigEntry::new("ElectricFieldReader");
        assert!(build(&state, &no_voltage, Some("detector1"), create).is_err());
        let too_high = base.clone().with("bias_voltage", "-200V");
        assert!(build(&state, &too_high, Some("detector1"), create).is_err());
        let mesh = base.with("model", "init");
        assert!(build(&state, &mesh, Some("detector1"), create).is_err());
    }

    #[test]
    fn test_requires_placed_detector() -> Result<()> {
        let mut state = state(vec![detector("detector1")]);
        let config = ConfigEntry::new("ElectricFieldReader").with("voltage", "10V");
        let mut module = build(
            &state,
            &config,
            Some("detector1"),
            ElectricFieldReader::from_setup,
        )?;
        let (ctx, bus) = state.split(None);
        assert!(module.init(&ctx, bus).is_err());
        Ok(())
    }
}
