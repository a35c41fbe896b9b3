//! File I/O for configurations and run results.

pub mod document;
pub mod summary;

pub use document::{from_toml_str, read_config, to_toml_string, write_config};
pub use summary::{read_summary, write_summary};
