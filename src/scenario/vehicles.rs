//! Vehicle classes and the roster placed in the network at rollout start
//!
//! Each class pairs an acceleration controller with a routing controller and
//! carries its car-following and lane-change parameters. Controllers are
//! closed enums; the simulator resolves them by class name, so they
//! serialize as `[class_name, params]` pairs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{FlowError, Result};

/// Noise magnitude applied to human (IDM) acceleration
pub const HUMAN_ACCEL_NOISE: f64 = 0.2;

/// Deceleration bound shared by every class in the default roster (m/s^2)
pub const DEFAULT_DECEL: f64 = 1.5;

/// Wire form of a controller: class name plus its keyword parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ControllerRepr(String, BTreeMap<String, f64>);

/// Longitudinal (acceleration) control strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "ControllerRepr", try_from = "ControllerRepr")]
pub enum AccelerationController {
    /// Intelligent Driver Model with Gaussian acceleration noise
    Idm { noise: f64 },
    /// Pass-through controller; actions come from the external policy
    Rl,
}

impl AccelerationController {
    /// Class name the simulator resolves this controller by
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Idm { .. } => "IDMController",
            Self::Rl => "RLController",
        }
    }

    pub fn is_rl(&self) -> bool {
        matches!(self, Self::Rl)
    }
}

impl From<AccelerationController> for ControllerRepr {
    fn from(controller: AccelerationController) -> Self {
        let mut params = BTreeMap::new();
        if let AccelerationController::Idm { noise } = controller {
            params.insert("noise".to_string(), noise);
        }
        ControllerRepr(controller.class_name().to_string(), params)
    }
}

impl TryFrom<ControllerRepr> for AccelerationController {
    type Error = String;

    fn try_from(repr: ControllerRepr) -> std::result::Result<Self, Self::Error> {
        let ControllerRepr(name, params) = repr;
        match name.as_str() {
            "IDMController" => {
                expect_params(&name, &params, &["noise"])?;
                Ok(Self::Idm {
                    noise: params["noise"],
                })
            }
            "RLController" => {
                expect_params(&name, &params, &[])?;
                Ok(Self::Rl)
            }
            other => Err(format!("unknown acceleration controller: {other}")),
        }
    }
}

/// Controller params must carry exactly the keys the class takes
fn expect_params(
    class: &str,
    params: &BTreeMap<String, f64>,
    keys: &[&str],
) -> std::result::Result<(), String> {
    if let Some(missing) = keys.iter().find(|key| !params.contains_key(**key)) {
        return Err(format!("{class} is missing param {missing}"));
    }
    if let Some(extra) = params.keys().find(|key| !keys.contains(&key.as_str())) {
        return Err(format!("{class} does not take param {extra}"));
    }
    Ok(())
}

/// Routing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ControllerRepr", try_from = "ControllerRepr")]
pub enum RoutingController {
    /// Keeps vehicles circulating on closed networks
    ContinuousRouter,
}

impl RoutingController {
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::ContinuousRouter => "ContinuousRouter",
        }
    }
}

impl From<RoutingController> for ControllerRepr {
    fn from(controller: RoutingController) -> Self {
        ControllerRepr(controller.class_name().to_string(), BTreeMap::new())
    }
}

impl TryFrom<ControllerRepr> for RoutingController {
    type Error = String;

    fn try_from(repr: ControllerRepr) -> std::result::Result<Self, Self::Error> {
        let ControllerRepr(name, params) = repr;
        match name.as_str() {
            "ContinuousRouter" => {
                expect_params(&name, &params, &[])?;
                Ok(Self::ContinuousRouter)
            }
            other => Err(format!("unknown routing controller: {other}")),
        }
    }
}

/// Speed-compliance mode enforced by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedMode {
    Aggressive,
    ObeySafeSpeed,
    NoCollide,
    RightOfWay,
    AllChecks,
}

/// Lane-change mode enforced by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneChangeMode {
    NoLcSafe,
    NoLcAggressive,
    SumoDefault,
}

/// Car-following parameters handed to the simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CarFollowingParams {
    pub speed_mode: SpeedMode,
    /// Maximum acceleration (m/s^2)
    pub accel: f64,
    /// Maximum deceleration (m/s^2)
    pub decel: f64,
    /// Driver imperfection in [0, 1]
    pub sigma: f64,
    /// Desired time headway (s)
    pub tau: f64,
    /// Minimum bumper-to-bumper gap (m)
    pub min_gap: f64,
    /// Maximum speed (m/s)
    pub max_speed: f64,
    pub speed_factor: f64,
    pub speed_dev: f64,
    pub impatience: f64,
    pub car_follow_model: String,
}

impl Default for CarFollowingParams {
    fn default() -> Self {
        Self {
            speed_mode: SpeedMode::RightOfWay,
            accel: 2.6,
            decel: 7.5,
            sigma: 0.5,
            tau: 1.0,
            min_gap: 2.5,
            max_speed: 30.0,
            speed_factor: 1.0,
            speed_dev: 0.1,
            impatience: 0.5,
            car_follow_model: "IDM".to_string(),
        }
    }
}

impl CarFollowingParams {
    /// Defaults with the given speed mode and deceleration bound
    pub fn new(speed_mode: SpeedMode, decel: f64) -> Self {
        Self {
            speed_mode,
            decel,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaneChangeParams {
    pub lane_change_mode: LaneChangeMode,
    pub model: String,
}

impl Default for LaneChangeParams {
    fn default() -> Self {
        Self {
            lane_change_mode: LaneChangeMode::NoLcSafe,
            model: "LC2013".to_string(),
        }
    }
}

/// One vehicle class of the roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleClassSpec {
    /// Unique within the roster
    pub veh_id: String,
    pub acceleration_controller: AccelerationController,
    pub routing_controller: RoutingController,
    pub car_following_params: CarFollowingParams,
    pub lane_change_params: LaneChangeParams,
    /// Speed at insertion (m/s)
    pub initial_speed: f64,
    /// Vehicles of this class to instantiate
    pub num_vehicles: usize,
}

impl VehicleClassSpec {
    /// Stochastic IDM-driven human vehicle
    pub fn human(veh_id: impl Into<String>) -> Self {
        Self::with_controller(veh_id, AccelerationController::Idm {
            noise: HUMAN_ACCEL_NOISE,
        })
    }

    /// Policy-driven learning agent
    pub fn rl(veh_id: impl Into<String>) -> Self {
        Self::with_controller(veh_id, AccelerationController::Rl)
    }

    fn with_controller(veh_id: impl Into<String>, controller: AccelerationController) -> Self {
        Self {
            veh_id: veh_id.into(),
            acceleration_controller: controller,
            routing_controller: RoutingController::ContinuousRouter,
            car_following_params: CarFollowingParams::new(SpeedMode::ObeySafeSpeed, DEFAULT_DECEL),
            lane_change_params: LaneChangeParams::default(),
            initial_speed: 0.0,
            num_vehicles: 1,
        }
    }
}

/// Ordered roster of vehicle classes with unique identifiers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<VehicleClassSpec>", try_from = "Vec<VehicleClassSpec>")]
pub struct VehicleParams {
    classes: Vec<VehicleClassSpec>,
}

impl VehicleParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a class, rejecting identifiers already in the roster
    pub fn add(&mut self, spec: VehicleClassSpec) -> Result<()> {
        if self.get(&spec.veh_id).is_some() {
            return Err(FlowError::DuplicateVehicleId(spec.veh_id));
        }
        self.classes.push(spec);
        Ok(())
    }

    pub fn get(&self, veh_id: &str) -> Option<&VehicleClassSpec> {
        self.classes.iter().find(|c| c.veh_id == veh_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|c| c.veh_id.as_str())
    }

    pub fn classes(&self) -> &[VehicleClassSpec] {
        &self.classes
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Total vehicles across all classes
    pub fn num_vehicles(&self) -> usize {
        self.classes.iter().map(|c| c.num_vehicles).sum()
    }

    pub fn num_rl_vehicles(&self) -> usize {
        self.classes
            .iter()
            .filter(|c| c.acceleration_controller.is_rl())
            .map(|c| c.num_vehicles)
            .sum()
    }

    pub fn num_human_vehicles(&self) -> usize {
        self.num_vehicles() - self.num_rl_vehicles()
    }
}

impl From<VehicleParams> for Vec<VehicleClassSpec> {
    fn from(params: VehicleParams) -> Self {
        params.classes
    }
}

impl TryFrom<Vec<VehicleClassSpec>> for VehicleParams {
    type Error = FlowError;

    fn try_from(classes: Vec<VehicleClassSpec>) -> Result<Self> {
        let mut params = Self::new();
        for spec in classes {
            params.add(spec)?;
        }
        Ok(params)
    }
}

/// Build the mixed roster: for each pair index `i`, a `human{i}` class
/// followed by an `rl{i}` class, one vehicle each
pub fn build_roster(pairs: usize) -> Result<VehicleParams> {
    let mut vehicles = VehicleParams::new();
    for i in 0..pairs {
        vehicles.add(VehicleClassSpec::human(format!("human{i}")))?;
        vehicles.add(VehicleClassSpec::rl(format!("rl{i}")))?;
    }
    Ok(vehicles)
}
