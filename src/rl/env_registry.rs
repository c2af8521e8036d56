//! Environment factories and the named-environment registry
//!
//! Rollout workers look environments up by name and call the registered
//! factory with the trainer's `env_config`. The factory rebuilds the
//! scenario from the serialized bundle carried there, so every worker ends
//! up with an identical environment.

use std::collections::BTreeMap;
use std::fmt;

use super::config::EnvConfig;
use crate::error::{FlowError, Result};
use crate::scenario::{
    EnvClass, EnvParams, FlowParams, InitialConfig, NetParams, NetworkClass, Simulator,
    SumoParams, VehicleParams,
};

/// Network instance as handed to the simulator
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkInstance {
    /// Network name, taken from the experiment tag
    pub name: String,
    pub class: NetworkClass,
    pub vehicles: VehicleParams,
    pub net_params: NetParams,
    pub initial_config: InitialConfig,
}

/// Fully resolved environment, ready for the simulator to instantiate
#[derive(Debug, Clone, PartialEq)]
pub struct FlowEnv {
    /// Registered environment name
    pub name: String,
    pub env_class: EnvClass,
    pub simulator: Simulator,
    pub env_params: EnvParams,
    pub sim_params: SumoParams,
    pub network: NetworkInstance,
}

impl FlowEnv {
    pub fn new(name: impl Into<String>, params: FlowParams) -> Self {
        Self {
            name: name.into(),
            env_class: params.env_name,
            simulator: params.simulator,
            env_params: params.env,
            sim_params: params.sim,
            network: NetworkInstance {
                name: params.exp_tag,
                class: params.network,
                vehicles: params.veh,
                net_params: params.net,
                initial_config: params.initial,
            },
        }
    }

    pub fn horizon(&self) -> u32 {
        self.env_params.horizon
    }

    /// Vehicles whose actions come from the policy
    pub fn num_rl_vehicles(&self) -> usize {
        self.network.vehicles.num_rl_vehicles()
    }
}

/// Builds an environment from the trainer's env context
pub type EnvCreator = Box<dyn Fn(&EnvConfig) -> Result<FlowEnv> + Send + Sync>;

/// Name an environment class is registered under at `version`
pub fn env_name(class: EnvClass, version: u32) -> String {
    format!("{}-v{}", class.name(), version)
}

/// Create an environment factory for `params` and the name to register it under
///
/// The factory prefers the bundle serialized into `env_config.flow_params`
/// and falls back to the captured `params` when none is present.
pub fn make_create_env(params: &FlowParams, version: u32) -> (EnvCreator, String) {
    let name = env_name(params.env_name, version);
    let captured = params.clone();
    let env_id = name.clone();

    let create_env: EnvCreator = Box::new(move |env_config: &EnvConfig| -> Result<FlowEnv> {
        let params = match &env_config.flow_params {
            Some(json) => FlowParams::from_json(json)?,
            None => captured.clone(),
        };
        Ok(FlowEnv::new(env_id.clone(), params))
    });

    (create_env, name)
}

/// Named-environment registry
#[derive(Default)]
pub struct EnvRegistry {
    creators: BTreeMap<String, EnvCreator>,
}

impl EnvRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a name not yet taken
    pub fn register(&mut self, name: impl Into<String>, creator: EnvCreator) -> Result<()> {
        let name = name.into();
        if self.creators.contains_key(&name) {
            return Err(FlowError::EnvAlreadyRegistered(name));
        }
        log::debug!("registered environment {name}");
        self.creators.insert(name, creator);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.creators.contains_key(name)
    }

    /// Build the environment registered under `name`
    pub fn make(&self, name: &str, env_config: &EnvConfig) -> Result<FlowEnv> {
        let creator = self
            .creators
            .get(name)
            .ok_or_else(|| FlowError::UnknownEnv(name.to_string()))?;
        creator(env_config)
    }

    /// Lowest version of `class` whose name is still free
    pub fn next_version(&self, class: EnvClass) -> u32 {
        (0..)
            .find(|&version| !self.contains(&env_name(class, version)))
            .unwrap_or_default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.creators.keys().map(String::as_str)
    }
}

impl fmt::Debug for EnvRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvRegistry")
            .field("names", &self.creators.keys().collect::<Vec<_>>())
            .finish()
    }
}
