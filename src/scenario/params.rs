//! Simulation, episode, network and placement parameters
//!
//! Optional values stay `Option` rather than being skipped so that the
//! serialized bundle always carries every key its consumers read. Parsing
//! holds the same line: an absent key is an error, only an explicit `null`
//! reads as `None`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Simulation-stepping parameters for the microsimulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SumoParams {
    /// Seconds per simulation step
    pub sim_step: f64,
    pub render: bool,
    /// Restart the simulator process on every reset
    pub restart_instance: bool,
    #[serde(deserialize_with = "Option::deserialize")]
    pub emission_path: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub port: Option<u16>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub seed: Option<u64>,
    pub no_step_log: bool,
    pub print_warnings: bool,
    /// Seconds a stuck vehicle waits before teleporting, -1 disables
    pub teleport_time: i32,
    pub num_clients: u32,
    pub use_ballistic: bool,
}

impl Default for SumoParams {
    fn default() -> Self {
        Self {
            sim_step: 0.1,
            render: false,
            restart_instance: false,
            emission_path: None,
            port: None,
            seed: None,
            no_step_log: true,
            print_warnings: true,
            teleport_time: -1,
            num_clients: 1,
            use_ballistic: false,
        }
    }
}

/// Reward-shaping and action bounds for the acceleration environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccelEnvParams {
    /// Desired velocity for the reward (m/s)
    pub target_velocity: f64,
    /// Maximum acceleration for RL vehicles (m/s^2)
    pub max_accel: f64,
    /// Maximum deceleration for RL vehicles (m/s^2)
    pub max_decel: f64,
    /// Sort vehicle ids by position in observations
    pub sort_vehicles: bool,
}

impl Default for AccelEnvParams {
    fn default() -> Self {
        Self {
            target_velocity: 20.0,
            max_accel: 3.0,
            max_decel: 3.0,
            sort_vehicles: false,
        }
    }
}

/// Episode parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvParams {
    /// Simulation steps per rollout
    pub horizon: u32,
    pub additional_params: AccelEnvParams,
    pub warmup_steps: u32,
    pub sims_per_step: u32,
    pub evaluate: bool,
    pub clip_actions: bool,
}

impl EnvParams {
    pub fn new(horizon: u32, additional_params: AccelEnvParams) -> Self {
        Self {
            horizon,
            additional_params,
            warmup_steps: 0,
            sims_per_step: 1,
            evaluate: false,
            clip_actions: true,
        }
    }
}

/// Topology defaults of the figure-eight network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FigureEightNetParams {
    /// Radius of each ring (m)
    pub radius_ring: f64,
    pub lanes: u32,
    /// Speed limit on all edges (m/s)
    pub speed_limit: f64,
    /// Points used to draw each curved edge
    pub resolution: u32,
}

impl Default for FigureEightNetParams {
    fn default() -> Self {
        Self {
            radius_ring: 30.0,
            lanes: 1,
            speed_limit: 30.0,
            resolution: 40,
        }
    }
}

/// Network parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetParams {
    pub additional_params: FigureEightNetParams,
    #[serde(deserialize_with = "Option::deserialize")]
    pub inflows: Option<Vec<String>>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub osm_path: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub template: Option<String>,
}

/// Vehicle placement at initialization and reset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitialConfig {
    pub shuffle: bool,
    pub spacing: String,
    pub min_gap: f64,
    pub perturbation: f64,
    pub x0: f64,
    pub bunching: f64,
    /// Lanes to distribute vehicles over, `None` for all lanes
    #[serde(deserialize_with = "Option::deserialize")]
    pub lanes_distribution: Option<u32>,
    pub edges_distribution: String,
    pub additional_params: BTreeMap<String, serde_json::Value>,
}

impl Default for InitialConfig {
    fn default() -> Self {
        Self {
            shuffle: false,
            spacing: "uniform".to_string(),
            min_gap: 0.0,
            perturbation: 0.0,
            x0: 0.0,
            bunching: 0.0,
            lanes_distribution: None,
            edges_distribution: "all".to_string(),
            additional_params: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sumo_defaults() {
        let sim = SumoParams::default();
        assert_eq!(sim.sim_step, 0.1);
        assert!(!sim.render);
        assert!(!sim.restart_instance);
        assert_eq!(sim.teleport_time, -1);
    }

    #[test]
    fn test_optional_fields_serialize_as_null() {
        let value = serde_json::to_value(SumoParams::default()).unwrap();
        assert_eq!(value["emission_path"], json!(null));
        assert_eq!(value["port"], json!(null));
        assert_eq!(value["seed"], json!(null));
    }

    #[test]
    fn test_missing_optional_key_rejected() {
        let mut value = serde_json::to_value(SumoParams::default()).unwrap();
        value.as_object_mut().unwrap().remove("seed");
        assert!(serde_json::from_value::<SumoParams>(value).is_err());

        let mut value = serde_json::to_value(InitialConfig::default()).unwrap();
        value.as_object_mut().unwrap().remove("lanes_distribution");
        assert!(serde_json::from_value::<InitialConfig>(value).is_err());

        let mut value = serde_json::to_value(NetParams::default()).unwrap();
        value.as_object_mut().unwrap().remove("inflows");
        assert!(serde_json::from_value::<NetParams>(value).is_err());
    }

    #[test]
    fn test_explicit_null_reads_as_none() {
        let value = serde_json::to_value(SumoParams::default()).unwrap();
        let sim: SumoParams = serde_json::from_value(value).unwrap();
        assert_eq!(sim, SumoParams::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut value = serde_json::to_value(SumoParams::default()).unwrap();
        value["bogus"] = json!(1);
        assert!(serde_json::from_value::<SumoParams>(value).is_err());
    }

    #[test]
    fn test_env_params_new() {
        let env = EnvParams::new(1500, AccelEnvParams::default());
        assert_eq!(env.horizon, 1500);
        assert_eq!(env.warmup_steps, 0);
        assert_eq!(env.sims_per_step, 1);
        assert!(env.clip_actions);
        assert_eq!(env.additional_params.target_velocity, 20.0);
    }

    #[test]
    fn test_figure_eight_defaults() {
        let net = FigureEightNetParams::default();
        assert_eq!(net.radius_ring, 30.0);
        assert_eq!(net.lanes, 1);
        assert_eq!(net.speed_limit, 30.0);
        assert_eq!(net.resolution, 40);
    }

    #[test]
    fn test_initial_config_defaults() {
        let initial = InitialConfig::default();
        assert!(!initial.shuffle);
        assert_eq!(initial.spacing, "uniform");
        assert_eq!(initial.edges_distribution, "all");
        assert!(initial.lanes_distribution.is_none());
        assert!(initial.additional_params.is_empty());
    }
}
