use crate::UID;
use crate::config::ConfigEntry;

use super::DetectorTable;

/// Shared read-only context passed to pipeline modules.
///
/// Anything a module produces for later stages goes on the
/// [`super::Bus`] instead.
pub struct SimContext<'a> {
    pub global: &'a ConfigEntry,
    pub detectors: &'a DetectorTable,
    pub run_id: &'a UID,
    /// Current event number (starting at 1), `None` during init and finalize.
    pub event: Option<u64>,
}

impl<'a> SimContext<'a> {
    pub fn new(global: &'a ConfigEntry, detectors: &'a DetectorTable, run_id: &'a UID) -> Self {
        Self {
            global,
            detectors,
            run_id,
            event: None,
        }
    }
}
