use std::collections::HashMap;

use anyhow::Result;
use thiserror::Error;

use super::{ModuleKind, ModuleSetup, SimModule};

/// Builds one module instance from its setup.
pub type ModuleFactory = Box<dyn Fn(&ModuleSetup) -> Result<Box<dyn SimModule>>>;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("unknown module '{name}' (known modules: {})", known.join(", "))]
pub struct LookupError {
    pub name: String,
    pub known: Vec<String>,
}

/// A registered module implementation.
pub struct ModuleDescriptor {
    kind: ModuleKind,
    factory: ModuleFactory,
}

impl ModuleDescriptor {
    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn create(&self, setup: &ModuleSetup) -> Result<Box<dyn SimModule>> {
        (self.factory)(setup)
    }
}

/// Maps module names used in configurations to implementations.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, ModuleDescriptor>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with all built-in stages registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::sim::stages::register_builtins(&mut registry);
        registry
    }

    /// Registers (or replaces) a module implementation.
    pub fn register<F>(&mut self, name: &str, kind: ModuleKind, factory: F)
    where
        F: Fn(&ModuleSetup) -> Result<Box<dyn SimModule>> + 'static,
    {
        self.modules.insert(
            name.to_string(),
            ModuleDescriptor {
                kind,
                factory: Box::new(factory),
            },
        );
    }

    /// Looks up the implementation registered under `name`.
    pub fn resolve(&self, name: &str) -> std::result::Result<&ModuleDescriptor, LookupError> {
        self.modules.get(name).ok_or_else(|| LookupError {
            name: name.to_string(),
            known: self.names().into_iter().map(String::from).collect(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Registered module names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}
