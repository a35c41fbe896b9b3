use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::sim::coupling::{DetectorPlacement, Geometry, PrimaryVertices};
use crate::sim::framework::{Bus, ModuleId, ModuleSetup, SimContext, SimModule};
use crate::units::Dimension;

/// Square 2D histogram centred on the origin.
///
/// Bins cover `[-range / 2, range / 2)` on both axes. Entries outside that
/// area only increase `overflow`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram2D {
    pub bins_x: usize,
    pub bins_y: usize,
    /// [mm]
    pub range: f64,
    /// Row-major, `bins_x` counts per row.
    pub counts: Vec<u64>,
    pub entries: u64,
    pub overflow: u64,
}

/// Upper limit on `bins_x * bins_y`.
pub const MAX_BINS: usize = 1 << 24;

impl Histogram2D {
    pub fn new(bins_x: usize, bins_y: usize, range: f64) -> Result<Self> {
        let bins = bins_x
            .checked_mul(bins_y)
            .filter(|n| (1..=MAX_BINS).contains(n))
            .with_context(|| {
                format!("{bins_x} x {bins_y} bins, expected between 1 and {MAX_BINS} in total")
            })?;
        ensure!(range > 0.0 && range.is_finite(), "range must be positive");
        Ok(Self {
            bins_x,
            bins_y,
            range,
            counts: vec![0; bins],
            entries: 0,
            overflow: 0,
        })
    }

    fn bin(&self, value: f64, bins: usize) -> Option<usize> {
        let fraction = (value + self.range / 2.0) / self.range;
        if !(0.0..1.0).contains(&fraction) {
            return None;
        }
        Some(((fraction * bins as f64) as usize).min(bins - 1))
    }

    pub fn fill(&mut self, x: f64, y: f64) {
        self.entries += 1;
        match (self.bin(x, self.bins_x), self.bin(y, self.bins_y)) {
            (Some(i), Some(j)) => self.counts[j * self.bins_x + i] += 1,
            _ => self.overflow += 1,
        }
    }

    pub fn count(&self, i: usize, j: usize) -> Option<u64> {
        (i < self.bins_x && j < self.bins_y).then(|| self.counts[j * self.bins_x + i])
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistogramArtifact {
    pub module: String,
    pub detector: String,
    pub run_id: String,
    pub events: u64,
    pub histogram: Histogram2D,
}

/// Histograms where the primary particles of each event cross the detector plane.
///
/// At finalize the histogram is written to
/// `<output_directory>/<Module>_<detector>.json` if the global section sets
/// `output_directory`.
pub struct DetectorHistogrammer {
    id: ModuleId,
    detector: String,
    placement: Option<DetectorPlacement>,
    histogram: Histogram2D,
    events: u64,
}

impl DetectorHistogrammer {
    pub const NAME: &'static str = "DetectorHistogrammer";

    pub fn from_setup(setup: &ModuleSetup) -> Result<Self> {
        let detector = setup.require_detector()?.name().to_string();
        let c = setup.config;
        let bins_x = usize::try_from(c.count_or("bins_x", 100)?)?;
        let bins_y = usize::try_from(c.count_or("bins_y", 100)?)?;
        let range = c.quantity_or("range", Dimension::Length, "10mm")?;

        Ok(Self {
            id: setup.id.clone(),
            detector,
            placement: None,
            histogram: Histogram2D::new(bins_x, bins_y, range)?,
            events: 0,
        })
    }

    pub fn histogram(&self) -> &Histogram2D {
        &self.histogram
    }

    pub fn artifact_path(&self, directory: &Path) -> PathBuf {
        directory.join(format!("{}_{}.json", self.id.name, self.detector))
    }

    fn write(&self, path: &Path, run_id: &str) -> Result<()> {
        let artifact = HistogramArtifact {
            module: self.id.name.clone(),
            detector: self.detector.clone(),
            run_id: run_id.to_string(),
            events: self.events,
            histogram: self.histogram.clone(),
        };
        let file = File::create(path)
            .with_context(|| format!("Failed to create file: {}", path.display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &artifact)
            .with_context(|| format!("Failed to write histogram to: {}", path.display()))?;
        Ok(())
    }
}

impl SimModule for DetectorHistogrammer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, _ctx: &SimContext, bus: &mut Bus) -> Result<()> {
        let placement = bus
            .get::<Geometry>()
            .and_then(|g| g.get(&self.detector))
            .with_context(|| format!("detector '{}' has not been placed", self.detector))?;
        self.placement = Some(placement.clone());
        Ok(())
    }

    fn step(&mut self, ctx: &SimContext, bus: &mut Bus) -> Result<()> {
        let placement = self
            .placement
            .as_ref()
            .context("histogrammer stepped before init")?;
        let event = ctx.event.context("histogrammer stepped outside an event")?;
        let primaries = match bus.get::<PrimaryVertices>() {
            Some(p) if p.event == event => p,
            Some(p) => bail!(
                "primaries on the bus belong to event {}, not {event}; \
                 the deposition stage must run before the histogrammer",
                p.event
            ),
            None => bail!(
                "no primaries for event {event}; \
                 the deposition stage must run before the histogrammer"
            ),
        };
        self.events += 1;
        for vertex in &primaries.vertices {
            let local_position = placement.to_local(vertex.position);
            let local_direction = placement.orientation.apply_inverse(vertex.direction);
            if local_direction.dz.abs() < f64::EPSILON {
                continue;
            }
            // Straight line to the sensor plane at local z = 0.
            let t = -local_position.dz / local_direction.dz;
            let hit = local_position + local_direction * t;
            self.histogram.fill(hit.dx, hit.dy);
        }
        Ok(())
    }

    fn finalize(&mut self, ctx: &SimContext, _bus: &mut Bus) -> Result<()> {
        info!(
            id = %self.id,
            entries = self.histogram.entries,
            overflow = self.histogram.overflow,
            "histogram filled"
        );
        let Some(directory) = ctx.global.get("output_directory") else {
            return Ok(());
        };
        let directory = PathBuf::from(directory.to_string());
        fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create directory: {}", directory.display()))?;
        let path = self.artifact_path(&directory);
        self.write(&path, ctx.run_id.as_str())?;
        info!(path = %path.display(), "wrote histogram");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigEntry;
    use crate::geom::Vector;
    use crate::sim::coupling::PrimaryVertex;
    use crate::sim::stages::GeometryBuilder;
    use crate::sim::stages::testing::{build, detector, state, state_with_global};

    fn primaries(points: &[(f64, f64)]) -> PrimaryVertices {
        PrimaryVertices {
            event: 1,
            vertices: points
                .iter()
                .map(|&(x, y)| PrimaryVertex {
                    position: Vector::new(x, y, -0.5),
                    direction: Vector::new(0., 0., 1.),
                    energy: 100.0,
                    particle: "e-".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_histogram_binning() {
        let mut h = Histogram2D::new(4, 2, 8.0).unwrap();
        h.fill(-3.9, -3.9);
        h.fill(3.9, 3.9);
        h.fill(0.0, 0.0);
        h.fill(4.0, 0.0);
        assert_eq!(h.count(0, 0), Some(1));
        assert_eq!(h.count(3, 1), Some(1));
        assert_eq!(h.count(2, 1), Some(1));
        assert_eq!(h.count(4, 0), None);
        assert_eq!(h.entries, 4);
        assert_eq!(h.overflow, 1);
    }

    #[test]
    fn test_fills_projected_hits_and_writes_artifact() -> Result<()> {
        let out = tempfile::tempdir()?;
        let global = ConfigEntry::new("Allpix")
            .with("output_directory", out.path().to_string_lossy().as_ref());
        let mut state = state_with_global(global, vec![detector("detector1")]);
        let mut geometry = build(
            &state,
            &ConfigEntry::new("GeometryBuilderGeant4"),
            None,
            GeometryBuilder::from_setup,
        )?;
        let config = ConfigEntry::new("DetectorHistogrammer")
            .with("bins_x", 10)
            .with("bins_y", 10)
            .with("range", "10mm");
        let create = DetectorHistogrammer::from_setup;
        let mut module = build(&state, &config, Some("detector1"), create)?;

        let (ctx, bus) = state.split(None);
        geometry.init(&ctx, bus)?;
        module.init(&ctx, bus)?;
        bus.put(primaries(&[(0.5, 0.5), (-4.5, 4.5), (20.0, 0.0)]));
        let (ctx, bus) = state.split(Some(1));
        module.step(&ctx, bus)?;
        let (ctx, bus) = state.split(None);
        module.finalize(&ctx, bus)?;

        let h = module.histogram();
        assert_eq!(h.entries, 3);
        assert_eq!(h.overflow, 1);
        assert_eq!(h.count(5, 5), Some(1));
        assert_eq!(h.count(0, 9), Some(1));

        let path = out.path().join("DetectorHistogrammer_detector1.json");
        let artifact: HistogramArtifact = serde_json::from_reader(File::open(&path)?)?;
        assert_eq!(artifact.detector, "detector1");
        assert_eq!(artifact.events, 1);
        assert_eq!(artifact.run_id, state.run_id().as_str());
        assert_eq!(artifact.histogram, *h);
        Ok(())
    }

    #[test]
    fn test_requires_placement_and_output_is_optional() -> Result<()> {
        let mut state = state(vec![detector("detector1")]);
        let config = ConfigEntry::new("DetectorHistogrammer");
        let create = DetectorHistogrammer::from_setup;
        let mut module = build(&state, &config, Some("detector1"), create)?;
        let (ctx, bus) = state.split(None);
        assert!(module.init(&ctx, bus).is_err());
        module.finalize(&ctx, bus)?;
        Ok(())
    }

    #[test]
    fn test_validation() {
        let state = state(vec![detector("detector1")]);
        let create = DetectorHistogrammer::from_setup;
        let det = Some("detector1");
        let base = ConfigEntry::new("DetectorHistogrammer");
        assert!(build(&state, &base.clone().with("bins_x", 0), det, create).is_err());
        assert!(build(&state, &base.clone().with("range", "0mm"), det, create).is_err());
        assert!(build(&state, &base, None, create).is_err());

        let huge = base.clone().with("bins_x", 1_i64 << 33).with("bins_y", 1_i64 << 33);
        assert!(build(&state, &huge, det, create).is_err());
        let over_limit = base.clone().with("bins_x", 5000).with("bins_y", 5000);
        assert!(build(&state, &over_limit, det, create).is_err());
        let wide = base.with("bins_x", 4096).with("bins_y", 2);
        assert!(build(&state, &wide, det, create).is_ok());
    }

    #[test]
    fn test_bin_count_is_bounded() {
        assert!(Histogram2D::new(usize::MAX, 2, 1.0).is_err());
        assert!(Histogram2D::new(MAX_BINS + 1, 1, 1.0).is_err());
        assert!(Histogram2D::new(0, 10, 1.0).is_err());
        assert!(Histogram2D::new(10, 10, f64::NAN).is_err());
        assert_eq!(Histogram2D::new(3, 5, 1.0).unwrap().counts.len(), 15);
    }

    #[test]
    fn test_rejects_primaries_of_another_event() -> Result<()> {
        let mut state = state(vec![detector("detector1")]);
        let mut geometry = build(
            &state,
            &ConfigEntry::new("GeometryBuilderGeant4"),
            None,
            GeometryBuilder::from_setup,
        )?;
        let config = ConfigEntry::new("DetectorHistogrammer");
        let create = DetectorHistogrammer::from_setup;
        let mut module = build(&state, &config, Some("detector1"), create)?;
        let (ctx, bus) = state.split(None);
        geometry.init(&ctx, bus)?;
        module.init(&ctx, bus)?;

        let (ctx, bus) = state.split(Some(1));
        assert!(module.step(&ctx, bus).is_err());

        bus.put(primaries(&[(0.5, 0.5)]));
        let (ctx, bus) = state.split(Some(2));
        let err = module.step(&ctx, bus).unwrap_err();
        assert!(err.to_string().contains("event 1, not 2"));
        assert_eq!(module.histogram().entries, 0);
        Ok(())
    }
}
