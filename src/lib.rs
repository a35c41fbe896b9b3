//! Configuration-driven module pipeline for detector simulations.
//!
//! A run is described by a [`ConfigManager`]: one global entry, an ordered
//! list of module entries and a set of detectors. [`PipelineExecutor`]
//! resolves every module name through a [`ModuleRegistry`], builds the module
//! instances and runs them in sequence.
//!
//! ```no_run
//! use detsim::{ModuleRegistry, PipelineExecutor};
//! use std::path::Path;
//!
//! let manager = detsim::io::read_config(Path::new("demos/magnetic_field.toml")).unwrap();
//! let executor = PipelineExecutor::new(ModuleRegistry::with_builtins());
//! let summary = executor.run(manager).unwrap();
//! println!("{} modules executed", summary.executed());
//! ```

pub mod config;
pub mod error;
pub mod geom;
pub mod io;
pub mod logging;
pub mod name;
pub mod sim;
pub mod uid;
pub mod units;

// Prelude
pub use config::{ConfigEntry, ConfigError, ConfigManager, SettingValue};
pub use error::{Phase, RunError};
pub use geom::{Rotation, Vector};
pub use sim::framework::{
    AbortHandle, Bus, LookupError, ModuleKind, ModuleRegistry, PipelineExecutor, RunSummary,
    SimModule,
};
pub use uid::UID;
