//! Scenario parameter bundle and its textual form
//!
//! `FlowParams` is everything a rollout worker needs to rebuild the
//! simulated environment. It is embedded into the trainer configuration as
//! sorted-key, 4-space indented JSON so that worker processes can parse it
//! back without shared memory.

use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};

use super::params::{
    AccelEnvParams, EnvParams, FigureEightNetParams, InitialConfig, NetParams, SumoParams,
};
use super::vehicles::VehicleParams;
use crate::error::Result;

/// Tag of the figure-eight experiment
pub const EXP_TAG: &str = "singleagent_figure_eight";

/// Environment class the simulator instantiates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvClass {
    CustomEnv,
}

impl EnvClass {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CustomEnv => "CustomEnv",
        }
    }
}

/// Network class that generates the topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkClass {
    FigureEightNetwork,
}

impl NetworkClass {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FigureEightNetwork => "FigureEightNetwork",
        }
    }
}

/// Microsimulator backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Simulator {
    Traci,
}

/// Complete scenario bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowParams {
    /// Experiment name
    pub exp_tag: String,
    pub env_name: EnvClass,
    pub network: NetworkClass,
    pub simulator: Simulator,
    pub sim: SumoParams,
    pub env: EnvParams,
    pub net: NetParams,
    /// Vehicles placed in the network at the start of a rollout
    pub veh: VehicleParams,
    pub initial: InitialConfig,
}

impl FlowParams {
    /// Assemble the figure-eight scenario around a roster
    pub fn figure_eight(horizon: u32, veh: VehicleParams) -> Self {
        Self {
            exp_tag: EXP_TAG.to_string(),
            env_name: EnvClass::CustomEnv,
            network: NetworkClass::FigureEightNetwork,
            simulator: Simulator::Traci,
            sim: SumoParams {
                sim_step: 0.1,
                render: false,
                restart_instance: true,
                ..Default::default()
            },
            env: EnvParams::new(horizon, AccelEnvParams::default()),
            net: NetParams {
                additional_params: FigureEightNetParams::default(),
                ..Default::default()
            },
            veh,
            initial: InitialConfig::default(),
        }
    }

    /// Sorted-key JSON with 4-space indentation
    pub fn to_json(&self) -> Result<String> {
        // Round-trip through Value so struct fields come out key-sorted
        let value = serde_json::to_value(self)?;
        let mut buf = Vec::new();
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        value.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
