//! flight_replay - Replay a recorded flight as an autonomous mission
//!
//! Decodes GLOBAL_POSITION_INT records from a MAVLink telemetry log,
//! reduces them to a bounded waypoint list, uploads the result to a
//! vehicle link as a mission, and drives the vehicle through a scripted
//! sequence: guided mode, arm, takeoff, AUTO mission with timed
//! monitoring, then return to launch.
//!
//! The pure algorithms (path sampling, mission plans, distance
//! estimation) live in the `flight_replay_core` crate; this crate adds
//! log decoding, the vehicle link abstraction with a built-in simulated
//! vehicle, and the flight controller state machine.

pub mod config;
pub mod controller;
pub mod error;
pub mod link;
pub mod session;
pub mod tlog;

pub use config::ReplayConfig;
pub use controller::{distance_to_current_waypoint, FlightController, FlightPhase};
pub use error::ReplayError;
pub use link::{VehicleLink, VehicleMode};
pub use session::{build_plan, upload_mission, ReplaySession};
pub use tlog::TlogReader;
