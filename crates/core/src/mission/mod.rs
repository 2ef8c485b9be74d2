//! Mission items and capacity-bounded mission plans.
//!
//! Items follow the MAVLink MISSION_ITEM shape: sequence number, frame,
//! command, four command parameters, and a global coordinate with a
//! relative altitude. A plan is an ordered list of items bounded by the
//! vehicle's mission-list ceiling; the ceiling is supplied by the caller
//! rather than baked in here.

use thiserror::Error;

use crate::geo::GlobalPosition;

/// MAV_FRAME_GLOBAL_RELATIVE_ALT: altitude relative to the home position.
pub const MAV_FRAME_GLOBAL_RELATIVE_ALT: u8 = 3;

/// MAV_CMD_NAV_WAYPOINT: navigate to the given coordinate.
pub const MAV_CMD_NAV_WAYPOINT: u16 = 16;

/// Errors raised while assembling a mission plan.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("Mission full ({0} item limit)")]
    Full(usize),
}

/// A single mission command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionItem {
    /// Sequence number (0-indexed, assigned by the plan).
    pub seq: u16,
    /// Frame of reference.
    pub frame: u8,
    /// Command ID.
    pub command: u16,
    /// Current item flag (0=false, 1=true).
    pub current: u8,
    /// Autocontinue to the next item (0=false, 1=true).
    pub autocontinue: u8,
    /// PARAM1 (command-specific, unused for plain waypoints).
    pub param1: f32,
    /// PARAM2 (command-specific).
    pub param2: f32,
    /// PARAM3 (command-specific).
    pub param3: f32,
    /// PARAM4 (command-specific).
    pub param4: f32,
    /// Latitude in decimal degrees.
    pub lat_deg: f64,
    /// Longitude in decimal degrees.
    pub lon_deg: f64,
    /// Altitude in metres, relative to home.
    pub alt_m: f32,
}

impl MissionItem {
    /// Create a NAV_WAYPOINT item at the given coordinate.
    ///
    /// The parameter slots and flags are zeroed; they are reserved for
    /// protocol compatibility and carry nothing for a plain waypoint.
    pub fn nav_waypoint(seq: u16, target: GlobalPosition, alt_m: f32) -> Self {
        Self {
            seq,
            frame: MAV_FRAME_GLOBAL_RELATIVE_ALT,
            command: MAV_CMD_NAV_WAYPOINT,
            current: 0,
            autocontinue: 0,
            param1: 0.0,
            param2: 0.0,
            param3: 0.0,
            param4: 0.0,
            lat_deg: target.lat_deg,
            lon_deg: target.lon_deg,
            alt_m,
        }
    }

    /// The item's coordinate as a global position.
    pub fn position(&self) -> GlobalPosition {
        GlobalPosition::new(self.lat_deg, self.lon_deg)
    }
}

/// An ordered, capacity-bounded mission.
///
/// Sequence numbers are assigned positionally as items are added and are
/// never reused. The capacity mirrors the ceiling the vehicle imposes on
/// its mission list.
#[derive(Debug, Clone)]
pub struct MissionPlan {
    items: Vec<MissionItem>,
    capacity: usize,
}

impl MissionPlan {
    /// Create an empty plan bounded by the vehicle's mission-list ceiling.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    /// Build a plan from a sampled path, one NAV_WAYPOINT per waypoint.
    ///
    /// Every item gets the same cruise altitude. The altitude recorded in
    /// the source flight is deliberately discarded: replaying it could
    /// reproduce an unsafe profile.
    pub fn from_path(
        path: &[GlobalPosition],
        cruise_alt_m: f32,
        capacity: usize,
    ) -> Result<Self, PlanError> {
        let mut plan = Self::with_capacity(capacity);
        for target in path {
            plan.push(*target, cruise_alt_m)?;
        }
        Ok(plan)
    }

    /// Append a waypoint, assigning the next sequence number.
    pub fn push(&mut self, target: GlobalPosition, alt_m: f32) -> Result<(), PlanError> {
        if self.items.len() >= self.capacity {
            return Err(PlanError::Full(self.capacity));
        }
        let seq = self.items.len() as u16;
        self.items.push(MissionItem::nav_waypoint(seq, target, alt_m));
        Ok(())
    }

    /// Number of items in the plan.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item by sequence number.
    pub fn get(&self, seq: u16) -> Option<&MissionItem> {
        self.items.get(seq as usize)
    }

    /// All items in order.
    pub fn items(&self) -> &[MissionItem] {
        &self.items
    }

    /// The ceiling this plan was built against.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove all items.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
