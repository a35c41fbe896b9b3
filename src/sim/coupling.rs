//! Payloads exchanged between stages via the [`crate::sim::framework::Bus`].
//!
//! Stages never call each other. An upstream stage publishes one of these
//! types and a downstream stage checks for it during `init` or `step`.
//! All values are in internal units (see [`crate::units`]).
//!
//! Per-detector payloads are keyed by detector name and kept in `BTreeMap`s
//! so iteration order does not depend on hashing.

use std::collections::BTreeMap;

use crate::geom::{Rotation, Vector};

/// Placement of one detector in the global frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorPlacement {
    pub name: String,
    pub model: String,
    pub position: Vector,
    pub orientation: Rotation,
}

impl DetectorPlacement {
    /// Global point to detector-local coordinates.
    pub fn to_local(&self, point: Vector) -> Vector {
        self.orientation.apply_inverse(point - self.position)
    }

    pub fn to_global(&self, point: Vector) -> Vector {
        self.orientation.apply(point) + self.position
    }
}

/// Detector setup, published once by the geometry stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    /// Extra space around the outermost detectors [mm].
    pub world_margin: f64,
    pub detectors: Vec<DetectorPlacement>,
}

impl Geometry {
    pub fn get(&self, name: &str) -> Option<&DetectorPlacement> {
        self.detectors.iter().find(|d| d.name == name)
    }

    /// Axis-aligned box around all detector centres, widened by the margin.
    pub fn world_bounds(&self) -> Option<(Vector, Vector)> {
        let first = self.detectors.first()?.position;
        let (min, max) = self.detectors.iter().fold((first, first), |(lo, hi), d| {
            let p = d.position;
            (
                Vector::new(lo.dx.min(p.dx), lo.dy.min(p.dy), lo.dz.min(p.dz)),
                Vector::new(hi.dx.max(p.dx), hi.dy.max(p.dy), hi.dz.max(p.dz)),
            )
        });
        let m = Vector::new(self.world_margin, self.world_margin, self.world_margin);
        Some((min - m, max + m))
    }
}

/// Constant magnetic field, in the global frame and per detector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MagneticField {
    pub global: Vector,
    pub local: BTreeMap<String, Vector>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectricFieldModel {
    Constant,
    Linear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElectricField {
    pub model: ElectricFieldModel,
    /// Voltage across the sensor [MV].
    pub voltage: f64,
    /// Depletion voltage for the linear model [MV].
    pub bias_voltage: Option<f64>,
}

/// Electric field configuration per detector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElectricFields {
    pub by_detector: BTreeMap<String, ElectricField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryVertex {
    /// Global position [mm].
    pub position: Vector,
    /// Unit vector.
    pub direction: Vector,
    /// Kinetic energy [MeV].
    pub energy: f64,
    pub particle: String,
}

/// Primary particles of the current event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryVertices {
    pub event: u64,
    pub vertices: Vec<PrimaryVertex>,
}

/// Resolved numeric parameters recorded by stages, keyed by instance identifier
/// (`Module` or `Module:detector`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageParameters {
    by_instance: BTreeMap<String, BTreeMap<String, f64>>,
}

impl StageParameters {
    pub fn record(&mut self, instance: &str, key: &str, value: f64) {
        self.by_instance
            .entry(instance.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn get(&self, instance: &str, key: &str) -> Option<f64> {
        self.by_instance.get(instance)?.get(key).copied()
    }

    pub fn contains(&self, instance: &str) -> bool {
        self.by_instance.contains_key(instance)
    }

    pub fn instances(&self) -> impl Iterator<Item = &str> {
        self.by_instance.keys().map(|k| k.as_str())
    }
}
