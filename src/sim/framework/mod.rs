//! Generic pipeline framework.
//!
//! This module is domain-agnostic: it resolves configured module names to
//! implementations, constructs them, and drives them through a run while they
//! exchange data over a [`Bus`].

pub mod abort;
pub mod bus;
pub mod context;
pub mod detector;
pub mod executor;
pub mod module;
pub mod pipeline;
pub mod registry;
pub mod state;
pub mod summary;

pub use abort::AbortHandle;
pub use bus::Bus;
pub use context::SimContext;
pub use detector::{Detector, DetectorTable};
pub use executor::PipelineExecutor;
pub use module::{ModuleId, ModuleKind, ModuleSetup, SimModule};
pub use pipeline::Pipeline;
pub use registry::{LookupError, ModuleDescriptor, ModuleFactory, ModuleRegistry};
pub use state::RunState;
pub use summary::{ModuleReport, RunSummary};
