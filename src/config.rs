//! Replay configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ReplayError;

/// Configuration for a replay run.
///
/// Intervals, budgets, and timeouts are in milliseconds. A JSON file
/// with any subset of the fields can override the defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Mission-list ceiling imposed by the vehicle.
    pub max_mission_items: usize,
    /// Cruise altitude in metres applied to every uploaded waypoint,
    /// and the takeoff target.
    pub cruise_altitude_m: f32,
    /// Fraction of the takeoff target treated as "altitude reached".
    /// Waiting for exact equality could stall on sensor noise.
    pub takeoff_fraction: f32,
    /// Poll interval for mode-change convergence.
    pub mode_poll_ms: u64,
    /// Poll interval while waiting for arming.
    pub arm_poll_ms: u64,
    /// Poll interval while climbing to the takeoff altitude.
    pub climb_poll_ms: u64,
    /// Poll interval of the mission monitoring loop.
    pub monitor_poll_ms: u64,
    /// Wall-clock budget of the mission monitoring loop.
    pub monitor_budget_ms: u64,
    /// Upper bound for every request-until-observed loop. A vehicle that
    /// never confirms a request fails the run instead of stalling it.
    pub convergence_timeout_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            max_mission_items: 99,
            cruise_altitude_m: 30.0,
            takeoff_fraction: 0.95,
            mode_poll_ms: 100,
            arm_poll_ms: 1_000,
            climb_poll_ms: 1_000,
            monitor_poll_ms: 1_000,
            monitor_budget_ms: 60_000,
            convergence_timeout_ms: 60_000,
        }
    }
}

impl ReplayConfig {
    /// Load configuration overrides from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ReplayError> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| ReplayError::InvalidConfig(e.to_string()))
    }

    pub fn mode_poll(&self) -> Duration {
        Duration::from_millis(self.mode_poll_ms)
    }

    pub fn arm_poll(&self) -> Duration {
        Duration::from_millis(self.arm_poll_ms)
    }

    pub fn climb_poll(&self) -> Duration {
        Duration::from_millis(self.climb_poll_ms)
    }

    pub fn monitor_poll(&self) -> Duration {
        Duration::from_millis(self.monitor_poll_ms)
    }

    pub fn monitor_budget(&self) -> Duration {
        Duration::from_millis(self.monitor_budget_ms)
    }

    pub fn convergence_timeout(&self) -> Duration {
        Duration::from_millis(self.convergence_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReplayConfig::default();
        assert_eq!(config.max_mission_items, 99);
        assert_eq!(config.cruise_altitude_m, 30.0);
        assert_eq!(config.takeoff_fraction, 0.95);
        assert_eq!(config.monitor_budget(), Duration::from_secs(60));
        assert_eq!(config.mode_poll(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_json_override() {
        let config: ReplayConfig =
            serde_json::from_str(r#"{"max_mission_items": 50, "monitor_budget_ms": 5000}"#)
                .unwrap();
        assert_eq!(config.max_mission_items, 50);
        assert_eq!(config.monitor_budget_ms, 5_000);
        // Untouched fields keep their defaults
        assert_eq!(config.cruise_altitude_m, 30.0);
    }

    #[test]
    fn test_malformed_json_rejected() {
        let result: Result<ReplayConfig, _> = serde_json::from_str("not json");
        assert!(result.is_err());
    }
}
