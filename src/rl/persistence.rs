//! Experiment manifests on disk
//!
//! Each submitted experiment gets its own directory holding:
//! - `experiment.json` - the run specification plus requested resources
//! - `params.json` - the trainer configuration on its own, in the layout
//!   trainers write next to their checkpoints

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::config::TrainerConfig;
use super::experiment::ExperimentSpec;
use crate::error::{FlowError, Result};

pub const EXPERIMENT_FILE: &str = "experiment.json";
pub const PARAMS_FILE: &str = "params.json";

/// Contents of `experiment.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentManifest {
    pub name: String,
    /// Parallelism the context was initialized with (workers + driver)
    pub num_cpus: usize,
    pub spec: ExperimentSpec,
    /// Crate version that wrote the manifest
    pub version: String,
}

impl ExperimentManifest {
    pub fn new(name: impl Into<String>, num_cpus: usize, spec: ExperimentSpec) -> Self {
        Self {
            name: name.into(),
            num_cpus,
            spec,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Write the manifest and `params.json` under `dir`, creating it if needed
pub fn save_manifest(manifest: &ExperimentManifest, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;

    write_json(&dir.join(EXPERIMENT_FILE), manifest)?;
    write_json(&dir.join(PARAMS_FILE), &manifest.spec.config)?;

    Ok(())
}

pub fn load_manifest(dir: &Path) -> Result<ExperimentManifest> {
    read_json(&dir.join(EXPERIMENT_FILE))
}

pub fn load_params(dir: &Path) -> Result<TrainerConfig> {
    read_json(&dir.join(PARAMS_FILE))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|source| io_error(path, source))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path).map_err(|source| io_error(path, source))?;
    Ok(serde_json::from_str(&json)?)
}

fn io_error(path: &Path, source: std::io::Error) -> FlowError {
    FlowError::Io {
        path: PathBuf::from(path),
        source,
    }
}
