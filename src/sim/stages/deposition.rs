use std::f64::consts::PI;

use anyhow::{Context, Result, ensure};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::geom::Vector;
use crate::sim::coupling::{Geometry, PrimaryVertex, PrimaryVertices};
use crate::sim::framework::{Bus, ModuleSetup, SimContext, SimModule};
use crate::units::Dimension;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    /// Particles start in a disk of radius `beam_size` around `source_position`
    /// and travel along `beam_direction`.
    Beam,
    /// Particles start at `source_position` with isotropic directions.
    Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepositionConfig {
    pub physics_list: String,
    pub particle_type: String,
    /// [MeV]
    pub source_energy: f64,
    /// [mm]
    pub source_position: Vector,
    pub source_type: SourceType,
    /// [mm]
    pub beam_size: f64,
    pub beam_direction: Vector,
    pub number_of_particles: u64,
    /// [mm]
    pub max_step_length: f64,
}

impl DepositionConfig {
    pub fn from_setup(setup: &ModuleSetup) -> Result<Self> {
        let c = setup.config;

        let source_type = match c.choice_or("source_type", &["beam", "point"], "beam")?.as_str() {
            "point" => SourceType::Point,
            _ => SourceType::Beam,
        };
        let source_energy = c.quantity("source_energy", Dimension::Energy)?;
        ensure!(source_energy > 0.0, "source_energy must be positive");
        let beam_size = c.quantity_or("beam_size", Dimension::Length, "0mm")?;
        ensure!(beam_size >= 0.0, "beam_size must not be negative");
        let beam_direction = Vector::from_array(c.vector3_or(
            "beam_direction",
            Dimension::Dimensionless,
            "0 0 1",
        )?)
        .normalize()
        .context("beam_direction must not be a null vector")?;
        let number_of_particles = c.count_or("number_of_particles", 1)?;
        ensure!(number_of_particles > 0, "number_of_particles must be at least 1");
        let max_step_length = c.quantity_or("max_step_length", Dimension::Length, "1um")?;
        ensure!(max_step_length > 0.0, "max_step_length must be positive");

        Ok(Self {
            physics_list: c.text_or("physics_list", "FTFP_BERT_EMZ"),
            particle_type: c.text("particle_type")?,
            source_energy,
            source_position: Vector::from_array(c.vector3("source_position", Dimension::Length)?),
            source_type,
            beam_size,
            beam_direction,
            number_of_particles,
            max_step_length,
        })
    }
}

/// Generates the primary particles of every event.
///
/// The generator is seeded from the seed the framework assigns to this
/// instance, so a run with the same `random_seed` produces the same vertices.
pub struct DepositionGeant4 {
    config: DepositionConfig,
    rng: StdRng,
}

impl DepositionGeant4 {
    pub const NAME: &'static str = "DepositionGeant4";

    pub fn new(config: DepositionConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_setup(setup: &ModuleSetup) -> Result<Self> {
        Ok(Self::new(DepositionConfig::from_setup(setup)?, setup.seed))
    }

    pub fn config(&self) -> &DepositionConfig {
        &self.config
    }

    fn sample(&mut self) -> PrimaryVertex {
        let c = &self.config;
        let (position, direction) = match c.source_type {
            SourceType::Beam => {
                // Uniform in a disk perpendicular to the beam.
                let u = c.beam_direction.orthogonal().unwrap_or(Vector::new(1., 0., 0.));
                let v = c.beam_direction.cross(u);
                let r = c.beam_size * self.rng.gen_range(0.0..1.0_f64).sqrt();
                let phi = self.rng.gen_range(0.0..2.0 * PI);
                let offset = u * (r * phi.cos()) + v * (r * phi.sin());
                (c.source_position + offset, c.beam_direction)
            }
            SourceType::Point => {
                let cos_theta = self.rng.gen_range(-1.0..=1.0_f64);
                let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
                let phi = self.rng.gen_range(0.0..2.0 * PI);
                let direction =
                    Vector::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta);
                (c.source_position, direction)
            }
        };
        PrimaryVertex {
            position,
            direction,
            energy: c.source_energy,
            particle: c.particle_type.clone(),
        }
    }
}

impl SimModule for DepositionGeant4 {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, _ctx: &SimContext, bus: &mut Bus) -> Result<()> {
        ensure!(
            bus.contains::<Geometry>(),
            "the geometry has to be built before particles are deposited"
        );
        info!(
            physics_list = %self.config.physics_list,
            particle = %self.config.particle_type,
            energy_mev = self.config.source_energy,
            "configured particle source"
        );
        Ok(())
    }

    fn step(&mut self, ctx: &SimContext, bus: &mut Bus) -> Result<()> {
        let event = ctx.event.context("deposition runs per event")?;
        let vertices = (0..self.config.number_of_particles)
            .map(|_| self.sample())
            .collect::<Vec<_>>();
        debug!(event, particles = vertices.len(), "generated primaries");
        bus.put(PrimaryVertices { event, vertices });
        Ok(())
    }
}
