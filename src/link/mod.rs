//! Vehicle link abstraction.
//!
//! The replay core never touches a transport; everything it needs from
//! the vehicle (telemetry state, mode and arming requests, mission
//! upload) goes through the [`VehicleLink`] trait. A self-contained
//! simulated implementation lives in [`sim`].

pub mod sim;

use std::fmt;

use async_trait::async_trait;

use flight_replay_core::geo::GlobalPosition;
use flight_replay_core::mission::MissionItem;

use crate::error::ReplayError;

/// Vehicle flight mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleMode {
    Stabilize,
    Guided,
    Auto,
    Rtl,
}

impl VehicleMode {
    /// The MAVLink mode name.
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleMode::Stabilize => "STABILIZE",
            VehicleMode::Guided => "GUIDED",
            VehicleMode::Auto => "AUTO",
            VehicleMode::Rtl => "RTL",
        }
    }
}

impl fmt::Display for VehicleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command and telemetry surface of a vehicle connection.
///
/// Implementations must be `Send` so a link can be driven behind
/// `&mut dyn VehicleLink`. Telemetry accessors report the most recent
/// state known to the link. Mode and arming requests are asynchronous on
/// the vehicle side: they may be delayed or rejected, and are not
/// guaranteed to have taken effect when the call returns. Callers poll
/// the matching accessor until the requested state is observed.
#[async_trait]
pub trait VehicleLink: Send {
    /// Establish the connection, waiting until the vehicle is ready.
    async fn connect(&mut self) -> Result<(), ReplayError>;

    /// Check if the link is currently connected.
    fn is_connected(&self) -> bool;

    /// Remove every mission item stored on the vehicle.
    async fn clear_mission(&mut self) -> Result<(), ReplayError>;

    /// Stage one mission item for the next upload.
    async fn push_mission_item(&mut self, item: &MissionItem) -> Result<(), ReplayError>;

    /// Commit the staged mission to the vehicle and await its
    /// acknowledgement.
    async fn upload_mission(&mut self) -> Result<(), ReplayError>;

    /// Current flight mode.
    async fn mode(&mut self) -> Result<VehicleMode, ReplayError>;

    /// Ask the vehicle to change flight mode.
    async fn request_mode(&mut self, mode: VehicleMode) -> Result<(), ReplayError>;

    /// Current arming state.
    async fn armed(&mut self) -> Result<bool, ReplayError>;

    /// Ask the vehicle to arm or disarm.
    async fn request_armed(&mut self, armed: bool) -> Result<(), ReplayError>;

    /// Command a takeoff to the given altitude above home.
    async fn takeoff(&mut self, target_alt_m: f32) -> Result<(), ReplayError>;

    /// Altitude in metres above the home position.
    async fn relative_altitude(&mut self) -> Result<f32, ReplayError>;

    /// Mission cursor: the slot the vehicle is currently heading toward.
    ///
    /// The cursor is one ahead of the uploaded item index: cursor `n`
    /// means the vehicle is flying toward uploaded item `n - 1`, and
    /// cursor 0 means no target yet (still at the home slot).
    async fn mission_current(&mut self) -> Result<u16, ReplayError>;

    /// Reset the mission cursor.
    async fn set_mission_current(&mut self, seq: u16) -> Result<(), ReplayError>;

    /// Uploaded mission item by its 0-based index.
    async fn mission_item(&mut self, index: u16) -> Result<MissionItem, ReplayError>;

    /// Current global position.
    async fn global_position(&mut self) -> Result<GlobalPosition, ReplayError>;

    /// Release the connection.
    async fn close(&mut self) -> Result<(), ReplayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names() {
        assert_eq!(VehicleMode::Guided.as_str(), "GUIDED");
        assert_eq!(VehicleMode::Auto.as_str(), "AUTO");
        assert_eq!(VehicleMode::Rtl.as_str(), "RTL");
        assert_eq!(VehicleMode::Stabilize.to_string(), "STABILIZE");
    }
}
