use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while assembling or launching an experiment.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Unknown training algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Unknown environment: {0}")]
    UnknownEnv(String),

    #[error("Environment already registered: {0}")]
    EnvAlreadyRegistered(String),

    #[error("Duplicate vehicle id in roster: {0}")]
    DuplicateVehicleId(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Execution context used before init")]
    ContextNotInitialized,

    #[error("Execution context already initialized with {0} cpus")]
    ContextAlreadyInitialized(usize),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, FlowError>;
