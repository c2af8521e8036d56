//! Run specification submitted to the execution context

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::config::TrainerConfig;
use crate::error::{FlowError, Result};

/// Condition that ends a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopCondition {
    pub training_iteration: u32,
}

/// One named experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSpec {
    /// Training algorithm name
    pub run: String,
    /// Registered environment name
    pub env: String,
    pub config: TrainerConfig,
    /// Checkpoint every N training iterations
    pub checkpoint_freq: u32,
    pub checkpoint_at_end: bool,
    /// Trial failures tolerated before the run is abandoned
    pub max_failures: u32,
    pub stop: StopCondition,
}

impl ExperimentSpec {
    pub fn validate(&self) -> Result<()> {
        if self.run.is_empty() {
            return Err(FlowError::InvalidConfig("run must name an algorithm".to_string()));
        }

        if self.env.is_empty() {
            return Err(FlowError::InvalidConfig("env must name an environment".to_string()));
        }

        if self.stop.training_iteration == 0 {
            return Err(FlowError::InvalidConfig(
                "stop.training_iteration must be at least 1".to_string(),
            ));
        }

        self.config.validate()
    }
}

/// Experiments keyed by name
pub type Experiments = BTreeMap<String, ExperimentSpec>;
