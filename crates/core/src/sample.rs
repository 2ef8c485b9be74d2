//! Position records decoded from a telemetry log.

use crate::geo::GlobalPosition;

/// A single global position record from a recorded flight.
///
/// Coordinates use the MAVLink scaled-integer encoding (degrees * 1e7)
/// exactly as decoded from the log. The recorded altitude is carried
/// through but deliberately not used when building a mission; replayed
/// flights get a fixed cruise altitude instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSample {
    /// Latitude in degrees * 1e7.
    pub lat_e7: i32,
    /// Longitude in degrees * 1e7.
    pub lon_e7: i32,
    /// Altitude in millimetres above sea level.
    pub alt_mm: i32,
    /// Position of this record in the decoded sequence.
    pub index: usize,
}

impl PositionSample {
    /// Latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.lat_e7 as f64 / 1e7
    }

    /// Longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.lon_e7 as f64 / 1e7
    }

    /// The record as a decimal-degree global position.
    pub fn position(&self) -> GlobalPosition {
        GlobalPosition::new(self.latitude(), self.longitude())
    }
}
