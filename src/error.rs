use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::sim::framework::ModuleId;

/// Lifecycle phase of a module instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Init,
    Event(u64),
    Finalize,
}

impl Phase {
    pub fn event(&self) -> Option<u64> {
        match self {
            Phase::Event(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => f.write_str("init"),
            Phase::Event(n) => write!(f, "event {n}"),
            Phase::Finalize => f.write_str("finalize"),
        }
    }
}

/// Failure of a pipeline run. Any of these stops the run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    #[error("module #{index} '{id}' could not be constructed")]
    Construction {
        index: usize,
        id: ModuleId,
        #[source]
        source: anyhow::Error,
    },

    #[error("module #{index} '{id}' failed during {phase}")]
    Module {
        index: usize,
        id: ModuleId,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    #[error("run aborted before module #{index} '{id}' ({phase})")]
    Aborted {
        index: usize,
        id: ModuleId,
        phase: Phase,
    },
}

impl RunError {
    /// Sequence position of the module entry the error belongs to.
    pub fn index(&self) -> Option<usize> {
        match self {
            RunError::Config(_) => None,
            RunError::Construction { index, .. }
            | RunError::Module { index, .. }
            | RunError::Aborted { index, .. } => Some(*index),
        }
    }

    pub fn module(&self) -> Option<&ModuleId> {
        match self {
            RunError::Config(_) => None,
            RunError::Construction { id, .. }
            | RunError::Module { id, .. }
            | RunError::Aborted { id, .. } => Some(id),
        }
    }
}
