//! Configuration objects consumed by the pipeline.
//!
//! A [`ConfigManager`] holds one global [`ConfigEntry`], the ordered module
//! entries and the detector entries. Setting semantics belong to the modules;
//! this layer only stores values and checks that names resolve.

pub mod entry;
pub mod error;
pub mod manager;
pub mod value;

pub use entry::{ConfigEntry, SettingError};
pub use error::ConfigError;
pub use manager::{ConfigManager, PlannedInstance};
pub use value::SettingValue;
