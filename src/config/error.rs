use std::path::PathBuf;

use thiserror::Error;

use super::SettingError;
use crate::sim::framework::LookupError;

/// Problems found in a configuration before anything runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no global configuration was set")]
    MissingGlobal,

    #[error("no modules are configured")]
    NoModules,

    #[error("module #{index} cannot be resolved")]
    UnknownModule {
        index: usize,
        #[source]
        source: LookupError,
    },

    #[error("module #{index} '{module}' references unknown detector '{detector}'")]
    UnknownDetector {
        index: usize,
        module: String,
        detector: String,
    },

    #[error("no detector named '{0}'")]
    NoSuchDetector(String),

    #[error("detector '{0}' is defined more than once")]
    DuplicateDetector(String),

    #[error("module #{index} instantiates '{identifier}' which already exists")]
    DuplicateModule { index: usize, identifier: String },

    #[error("malformed setting")]
    MalformedSetting(#[from] SettingError),

    #[error("malformed option '{option}': {reason}")]
    MalformedOption { option: String, reason: String },

    #[error("failed to read '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{}'", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration document")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration document")]
    Serialize(#[from] toml::ser::Error),
}
