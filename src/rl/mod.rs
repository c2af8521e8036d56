//! Training setup for the figure-eight experiment
//!
//! Provides:
//! - Trainer configuration with PPO defaults and the experiment's overrides
//! - Named registries for training algorithms and environments
//! - Run specification and the execution context it is submitted to
//! - Manifest persistence for submitted experiments

pub mod cluster;
pub mod config;
pub mod env_registry;
pub mod experiment;
pub mod persistence;
pub mod registry;

pub use cluster::{ExecutionContext, ManifestContext, TrialStatus, TrialSummary};
pub use config::{EnvConfig, ModelConfig, TrainerConfig, TrainerOverrides};
pub use env_registry::{EnvCreator, EnvRegistry, FlowEnv, make_create_env};
pub use experiment::{ExperimentSpec, Experiments, StopCondition};
pub use persistence::{ExperimentManifest, load_manifest, load_params, save_manifest};
pub use registry::{AlgorithmRegistry, PPO};
