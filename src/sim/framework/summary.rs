use serde::{Deserialize, Serialize};

use super::ModuleId;

/// Timing of one module instance, summed over init, events and finalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleReport {
    /// Position of the configuration entry in the module sequence.
    pub index: usize,
    pub id: ModuleId,
    pub elapsed_s: f64,
}

/// Outcome of a successful run.
///
/// A run that fails stops at the failing module and returns a
/// [`crate::error::RunError`] instead, so every listed module completed and
/// `failed` is 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub events: u64,
    pub modules: Vec<ModuleReport>,
    pub failed: usize,
    pub elapsed_s: f64,
}

impl RunSummary {
    /// Number of module instances that ran to completion.
    pub fn executed(&self) -> usize {
        self.modules.len()
    }

    /// Instance identifiers in execution order.
    pub fn module_ids(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.id.to_string()).collect()
    }
}
