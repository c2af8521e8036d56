//! Figure-eight mixed-autonomy traffic experiment
//!
//! This library provides:
//! - Scenario description: vehicle roster and simulation parameters (scenario module)
//! - Trainer setup, registries and experiment submission (rl module)
//! - The training mode that wires them together (modes module)

pub mod error;
pub mod modes;
pub mod rl;
pub mod scenario;

pub use error::{FlowError, Result};
