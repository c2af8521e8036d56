//! Named training-algorithm registry

use std::collections::BTreeMap;

use super::config::TrainerConfig;
use crate::error::{FlowError, Result};

/// Name of the clipped-surrogate policy-gradient algorithm
pub const PPO: &str = "PPO";

/// Produces an algorithm's default trainer configuration
pub type DefaultConfigFn = fn() -> TrainerConfig;

/// A registered training algorithm
#[derive(Debug, Clone, Copy)]
pub struct AlgorithmEntry {
    name: &'static str,
    default_config: DefaultConfigFn,
}

impl AlgorithmEntry {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// A fresh copy of the algorithm's defaults
    pub fn default_config(&self) -> TrainerConfig {
        (self.default_config)()
    }
}

/// Maps algorithm names to their entries
#[derive(Debug, Clone, Default)]
pub struct AlgorithmRegistry {
    entries: BTreeMap<&'static str, AlgorithmEntry>,
}

impl AlgorithmRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in algorithms
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(PPO, TrainerConfig::ppo_default);
        registry
    }

    /// Register or replace an algorithm
    pub fn register(&mut self, name: &'static str, default_config: DefaultConfigFn) {
        self.entries.insert(
            name,
            AlgorithmEntry {
                name,
                default_config,
            },
        );
    }

    /// Resolve an algorithm by name
    pub fn get(&self, name: &str) -> Result<&AlgorithmEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| FlowError::UnknownAlgorithm(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}
