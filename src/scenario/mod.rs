//! Traffic scenario description
//!
//! Builds the vehicle roster and assembles it with the simulation, episode,
//! network and placement parameters into one serializable bundle. Nothing
//! here talks to the simulator.

pub mod flow_params;
pub mod params;
pub mod vehicles;

pub use flow_params::{EXP_TAG, EnvClass, FlowParams, NetworkClass, Simulator};
pub use params::{
    AccelEnvParams, EnvParams, FigureEightNetParams, InitialConfig, NetParams, SumoParams,
};
pub use vehicles::{
    AccelerationController, CarFollowingParams, LaneChangeMode, LaneChangeParams,
    RoutingController, SpeedMode, VehicleClassSpec, VehicleParams, build_roster,
};
