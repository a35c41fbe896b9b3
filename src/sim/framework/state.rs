use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use super::{Bus, DetectorTable, SimContext};
use crate::UID;
use crate::config::ConfigEntry;

/// Everything shared by the modules of one run.
///
/// Created by the executor at the start of a run and dropped at its end.
/// Modules only ever see it through a [`SimContext`] and a mutable [`Bus`],
/// one module at a time.
pub struct RunState {
    run_id: UID,
    global: ConfigEntry,
    detectors: DetectorTable,
    bus: Bus,
    seeder: StdRng,
}

impl RunState {
    pub fn new(global: ConfigEntry, detectors: DetectorTable, seed: u64) -> Self {
        Self {
            run_id: UID::new(),
            global,
            detectors,
            bus: Bus::new(),
            seeder: StdRng::seed_from_u64(seed),
        }
    }

    pub fn run_id(&self) -> &UID {
        &self.run_id
    }

    pub fn global(&self) -> &ConfigEntry {
        &self.global
    }

    pub fn detectors(&self) -> &DetectorTable {
        &self.detectors
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Draws the seed for the next module instance.
    pub fn next_seed(&mut self) -> u64 {
        self.seeder.next_u64()
    }

    /// Lends the read-only context and the bus to one module.
    pub fn split(&mut self, event: Option<u64>) -> (SimContext<'_>, &mut Bus) {
        let mut ctx = SimContext::new(&self.global, &self.detectors, &self.run_id);
        ctx.event = event;
        (ctx, &mut self.bus)
    }
}
