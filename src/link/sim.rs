//! Simulated vehicle.
//!
//! A self-contained stand-in for a real vehicle link, usable in tests
//! and for running a replay without hardware. Mode and arming requests
//! take effect after a configurable latency, a takeoff climbs at a fixed
//! rate, AUTO mode flies the uploaded mission as a point mass advancing
//! the mission cursor on waypoint arrival, and RTL flies back to home.
//!
//! Vehicle state advances from elapsed time on every accessor call, so
//! there is no background task; under a paused test clock the simulation
//! is fully deterministic.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{Duration, Instant};

use flight_replay_core::geo::{self, GlobalPosition};
use flight_replay_core::mission::MissionItem;

use crate::error::ReplayError;
use crate::link::{VehicleLink, VehicleMode};

/// Configuration for the simulated vehicle.
#[derive(Debug, Clone)]
pub struct SimVehicleConfig {
    /// Ground speed while flying, m/s.
    pub speed_mps: f64,
    /// Climb and descent rate, m/s.
    pub climb_rate_mps: f32,
    /// Delay before a requested mode takes effect, ms.
    pub mode_latency_ms: u64,
    /// Delay before an arming request takes effect, ms.
    pub arm_latency_ms: u64,
    /// Distance at which a waypoint counts as reached, m.
    pub acceptance_radius_m: f64,
    /// GPS position noise standard deviation, m.
    pub gps_noise_m: f64,
    /// RNG seed for deterministic runs. None = random.
    pub seed: Option<u64>,
    /// When set, mode requests are accepted but never take effect.
    pub never_confirm_modes: bool,
}

impl Default for SimVehicleConfig {
    fn default() -> Self {
        Self {
            speed_mps: 20.0,
            climb_rate_mps: 2.5,
            mode_latency_ms: 250,
            arm_latency_ms: 1_500,
            acceptance_radius_m: 5.0,
            gps_noise_m: 0.0,
            seed: None,
            never_confirm_modes: false,
        }
    }
}

/// In-process simulated vehicle implementing [`VehicleLink`].
pub struct SimVehicle {
    config: SimVehicleConfig,
    home: GlobalPosition,
    connected: bool,
    connect_count: u32,
    mode: VehicleMode,
    pending_mode: Option<(VehicleMode, Instant)>,
    armed: bool,
    pending_arm: Option<(bool, Instant)>,
    position: GlobalPosition,
    rel_alt_m: f32,
    climb_target_m: Option<f32>,
    staged: Vec<MissionItem>,
    mission: Vec<MissionItem>,
    cursor: u16,
    rng: StdRng,
    last_update: Instant,
}

impl SimVehicle {
    /// Create a simulated vehicle homed at the given position.
    pub fn at_home(home: GlobalPosition, config: SimVehicleConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            home,
            connected: false,
            connect_count: 0,
            mode: VehicleMode::Stabilize,
            pending_mode: None,
            armed: false,
            pending_arm: None,
            position: home,
            rel_alt_m: 0.0,
            climb_target_m: None,
            staged: Vec::new(),
            mission: Vec::new(),
            cursor: 0,
            rng,
            last_update: Instant::now(),
        }
    }

    /// Create with default configuration.
    pub fn with_defaults(home: GlobalPosition) -> Self {
        Self::at_home(home, SimVehicleConfig::default())
    }

    /// How many times `connect` was called on this vehicle.
    pub fn connect_count(&self) -> u32 {
        self.connect_count
    }

    /// Number of items committed by the last mission upload.
    pub fn uploaded_len(&self) -> usize {
        self.mission.len()
    }

    /// Advance the simulation to the current instant.
    fn advance(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_update).as_secs_f64();
        self.last_update = now;

        // Mature pending acknowledgements.
        if let Some((mode, at)) = self.pending_mode {
            if now >= at {
                self.mode = mode;
                self.pending_mode = None;
                if mode == VehicleMode::Auto && !self.mission.is_empty() && self.cursor == 0 {
                    // Mission start: head for the first uploaded item
                    self.cursor = 1;
                }
            }
        }
        if let Some((armed, at)) = self.pending_arm {
            if now >= at {
                self.armed = armed;
                self.pending_arm = None;
            }
        }

        if dt <= 0.0 {
            return;
        }

        // Climb toward the takeoff target.
        if let Some(target) = self.climb_target_m {
            self.rel_alt_m = (self.rel_alt_m + self.config.climb_rate_mps * dt as f32).min(target);
            if self.rel_alt_m >= target {
                self.climb_target_m = None;
            }
        }

        match self.mode {
            VehicleMode::Auto => self.fly_mission(dt),
            VehicleMode::Rtl => self.fly_home(dt),
            _ => {}
        }
    }

    /// Fly toward the current mission target, advancing the cursor on
    /// arrival. The cursor holds at `mission.len()` once the final item
    /// is the target.
    fn fly_mission(&mut self, dt: f64) {
        if self.cursor == 0 {
            return;
        }
        let mut travel = self.config.speed_mps * dt;
        loop {
            let target = match self.mission.get(self.cursor as usize - 1) {
                Some(item) => item.position(),
                None => break,
            };
            let dist = geo::distance_metres(self.position, target);
            if dist > self.config.acceptance_radius_m && dist > travel {
                self.position = step_toward(self.position, target, travel);
                break;
            }
            self.position = target;
            travel = (travel - dist).max(0.0);
            if (self.cursor as usize) >= self.mission.len() {
                // Final waypoint reached: hold
                break;
            }
            self.cursor += 1;
            if travel <= 0.0 {
                break;
            }
        }
    }

    fn fly_home(&mut self, dt: f64) {
        let travel = self.config.speed_mps * dt;
        let dist = geo::distance_metres(self.position, self.home);
        if dist <= travel {
            self.position = self.home;
            self.rel_alt_m = (self.rel_alt_m - self.config.climb_rate_mps * dt as f32).max(0.0);
        } else {
            self.position = step_toward(self.position, self.home, travel);
        }
    }

    fn check_connected(&self) -> Result<(), ReplayError> {
        if self.connected {
            Ok(())
        } else {
            Err(ReplayError::ConnectionFailed("Not connected".to_string()))
        }
    }

    /// Gaussian noise via the Box-Muller transform.
    fn gaussian_noise(&mut self, stddev: f64) -> f64 {
        if stddev == 0.0 {
            return 0.0;
        }
        let u1: f64 = self.rng.gen::<f64>().max(f64::EPSILON);
        let u2: f64 = self.rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        z * stddev
    }
}

impl std::fmt::Debug for SimVehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimVehicle")
            .field("home", &self.home)
            .field("connected", &self.connected)
            .field("mode", &self.mode)
            .field("armed", &self.armed)
            .field("cursor", &self.cursor)
            .finish()
    }
}

#[async_trait]
impl VehicleLink for SimVehicle {
    async fn connect(&mut self) -> Result<(), ReplayError> {
        // Reset state on connect
        self.position = self.home;
        self.rel_alt_m = 0.0;
        self.climb_target_m = None;
        self.mode = VehicleMode::Stabilize;
        self.pending_mode = None;
        self.armed = false;
        self.pending_arm = None;
        self.staged.clear();
        self.mission.clear();
        self.cursor = 0;
        self.last_update = Instant::now();
        self.connected = true;
        self.connect_count += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn clear_mission(&mut self) -> Result<(), ReplayError> {
        self.check_connected()?;
        self.advance();
        self.staged.clear();
        self.mission.clear();
        self.cursor = 0;
        Ok(())
    }

    async fn push_mission_item(&mut self, item: &MissionItem) -> Result<(), ReplayError> {
        self.check_connected()?;
        self.staged.push(*item);
        Ok(())
    }

    async fn upload_mission(&mut self) -> Result<(), ReplayError> {
        self.check_connected()?;
        self.advance();
        self.mission = self.staged.clone();
        self.cursor = 0;
        Ok(())
    }

    async fn mode(&mut self) -> Result<VehicleMode, ReplayError> {
        self.check_connected()?;
        self.advance();
        Ok(self.mode)
    }

    async fn request_mode(&mut self, mode: VehicleMode) -> Result<(), ReplayError> {
        self.check_connected()?;
        self.advance();
        if self.config.never_confirm_modes || self.mode == mode {
            return Ok(());
        }
        if self.pending_mode.map(|(m, _)| m) != Some(mode) {
            let at = Instant::now() + Duration::from_millis(self.config.mode_latency_ms);
            self.pending_mode = Some((mode, at));
        }
        Ok(())
    }

    async fn armed(&mut self) -> Result<bool, ReplayError> {
        self.check_connected()?;
        self.advance();
        Ok(self.armed)
    }

    async fn request_armed(&mut self, armed: bool) -> Result<(), ReplayError> {
        self.check_connected()?;
        self.advance();
        if self.armed == armed {
            return Ok(());
        }
        if self.pending_arm.map(|(a, _)| a) != Some(armed) {
            let at = Instant::now() + Duration::from_millis(self.config.arm_latency_ms);
            self.pending_arm = Some((armed, at));
        }
        Ok(())
    }

    async fn takeoff(&mut self, target_alt_m: f32) -> Result<(), ReplayError> {
        self.check_connected()?;
        self.advance();
        self.climb_target_m = Some(target_alt_m);
        Ok(())
    }

    async fn relative_altitude(&mut self) -> Result<f32, ReplayError> {
        self.check_connected()?;
        self.advance();
        Ok(self.rel_alt_m)
    }

    async fn mission_current(&mut self) -> Result<u16, ReplayError> {
        self.check_connected()?;
        self.advance();
        Ok(self.cursor)
    }

    async fn set_mission_current(&mut self, seq: u16) -> Result<(), ReplayError> {
        self.check_connected()?;
        self.advance();
        self.cursor = seq;
        Ok(())
    }

    async fn mission_item(&mut self, index: u16) -> Result<MissionItem, ReplayError> {
        self.check_connected()?;
        self.mission
            .get(index as usize)
            .copied()
            .ok_or_else(|| ReplayError::Link(format!("No mission item at index {index}")))
    }

    async fn global_position(&mut self) -> Result<GlobalPosition, ReplayError> {
        self.check_connected()?;
        self.advance();
        let noise = self.config.gps_noise_m;
        if noise == 0.0 {
            return Ok(self.position);
        }
        let metres_per_deg = 111_320.0_f64;
        let lat = self.position.lat_deg + self.gaussian_noise(noise) / metres_per_deg;
        let lon = self.position.lon_deg
            + self.gaussian_noise(noise) / (metres_per_deg * self.position.lat_deg.to_radians().cos());
        Ok(GlobalPosition::new(lat, lon))
    }

    async fn close(&mut self) -> Result<(), ReplayError> {
        self.connected = false;
        Ok(())
    }
}

/// Move `metres` along the straight line from `from` to `to`.
fn step_toward(from: GlobalPosition, to: GlobalPosition, metres: f64) -> GlobalPosition {
    let total = geo::distance_metres(from, to);
    if total <= metres || total == 0.0 {
        return to;
    }
    let f = metres / total;
    GlobalPosition::new(
        from.lat_deg + (to.lat_deg - from.lat_deg) * f,
        from.lon_deg + (to.lon_deg - from.lon_deg) * f,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use flight_replay_core::mission::MissionPlan;
    use tokio::time::advance;

    const HOME: GlobalPosition = GlobalPosition {
        lat_deg: 35.6762,
        lon_deg: 139.6503,
    };

    fn quick_config() -> SimVehicleConfig {
        SimVehicleConfig {
            mode_latency_ms: 100,
            arm_latency_ms: 100,
            seed: Some(42),
            ..Default::default()
        }
    }

    async fn connected_vehicle() -> SimVehicle {
        let mut sim = SimVehicle::at_home(HOME, quick_config());
        sim.connect().await.unwrap();
        sim
    }

    fn plan_near_home(n: usize) -> MissionPlan {
        let path: Vec<GlobalPosition> = (1..=n)
            .map(|i| GlobalPosition::new(HOME.lat_deg + i as f64 * 0.0005, HOME.lon_deg))
            .collect();
        MissionPlan::from_path(&path, 30.0, 99).unwrap()
    }

    async fn upload(sim: &mut SimVehicle, plan: &MissionPlan) {
        sim.clear_mission().await.unwrap();
        for item in plan.items() {
            sim.push_mission_item(item).await.unwrap();
        }
        sim.upload_mission().await.unwrap();
    }

    #[tokio::test]
    async fn test_not_connected_errors() {
        let mut sim = SimVehicle::at_home(HOME, quick_config());
        assert!(!sim.is_connected());
        assert!(sim.mode().await.is_err());
        assert!(sim.clear_mission().await.is_err());
        assert!(sim.global_position().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_change_takes_latency() {
        let mut sim = connected_vehicle().await;
        assert_eq!(sim.mode().await.unwrap(), VehicleMode::Stabilize);

        sim.request_mode(VehicleMode::Guided).await.unwrap();
        assert_eq!(sim.mode().await.unwrap(), VehicleMode::Stabilize);

        advance(Duration::from_millis(150)).await;
        assert_eq!(sim.mode().await.unwrap(), VehicleMode::Guided);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_confirm_modes() {
        let mut sim = SimVehicle::at_home(
            HOME,
            SimVehicleConfig {
                never_confirm_modes: true,
                ..quick_config()
            },
        );
        sim.connect().await.unwrap();

        sim.request_mode(VehicleMode::Guided).await.unwrap();
        advance(Duration::from_secs(3600)).await;
        assert_eq!(sim.mode().await.unwrap(), VehicleMode::Stabilize);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arming_takes_latency() {
        let mut sim = connected_vehicle().await;
        sim.request_armed(true).await.unwrap();
        assert!(!sim.armed().await.unwrap());

        advance(Duration::from_millis(150)).await;
        assert!(sim.armed().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_takeoff_climbs_at_rate() {
        let mut sim = connected_vehicle().await;
        sim.takeoff(30.0).await.unwrap();
        assert_eq!(sim.relative_altitude().await.unwrap(), 0.0);

        // 2.5 m/s for 4 s
        advance(Duration::from_secs(4)).await;
        let alt = sim.relative_altitude().await.unwrap();
        assert!((alt - 10.0).abs() < 0.1, "got {alt}");

        // Climb caps at the target
        advance(Duration::from_secs(60)).await;
        assert_eq!(sim.relative_altitude().await.unwrap(), 30.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_mode_advances_cursor() {
        let mut sim = connected_vehicle().await;
        let plan = plan_near_home(3);
        upload(&mut sim, &plan).await;
        assert_eq!(sim.mission_current().await.unwrap(), 0);

        sim.set_mission_current(0).await.unwrap();
        sim.request_mode(VehicleMode::Auto).await.unwrap();
        advance(Duration::from_millis(150)).await;
        assert_eq!(sim.mode().await.unwrap(), VehicleMode::Auto);
        // Heading to the first item now
        assert_eq!(sim.mission_current().await.unwrap(), 1);

        // Waypoints are ~56 m apart; at 20 m/s the whole path takes
        // under 10 s
        advance(Duration::from_secs(30)).await;
        assert_eq!(sim.mission_current().await.unwrap(), 3);

        let pos = sim.global_position().await.unwrap();
        let last = plan.get(2).unwrap().position();
        assert!(geo::distance_metres(pos, last) < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rtl_returns_home() {
        let mut sim = connected_vehicle().await;
        let plan = plan_near_home(2);
        upload(&mut sim, &plan).await;
        sim.request_mode(VehicleMode::Auto).await.unwrap();
        advance(Duration::from_secs(30)).await;
        sim.mode().await.unwrap();

        sim.request_mode(VehicleMode::Rtl).await.unwrap();
        advance(Duration::from_secs(60)).await;
        assert_eq!(sim.mode().await.unwrap(), VehicleMode::Rtl);
        let pos = sim.global_position().await.unwrap();
        assert!(geo::distance_metres(pos, HOME) < 1.0);
    }

    #[tokio::test]
    async fn test_connect_resets_state() {
        let mut sim = connected_vehicle().await;
        let plan = plan_near_home(2);
        upload(&mut sim, &plan).await;
        sim.set_mission_current(2).await.unwrap();

        sim.connect().await.unwrap();
        assert_eq!(sim.mission_current().await.unwrap(), 0);
        assert_eq!(sim.uploaded_len(), 0);
        assert_eq!(sim.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_mission_item_out_of_range() {
        let mut sim = connected_vehicle().await;
        let plan = plan_near_home(2);
        upload(&mut sim, &plan).await;
        assert!(sim.mission_item(1).await.is_ok());
        assert!(sim.mission_item(2).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gps_noise_is_deterministic_with_seed() {
        async fn first_noisy_fix(seed: u64) -> GlobalPosition {
            let mut sim = SimVehicle::at_home(
                HOME,
                SimVehicleConfig {
                    gps_noise_m: 2.0,
                    seed: Some(seed),
                    ..Default::default()
                },
            );
            sim.connect().await.unwrap();
            sim.global_position().await.unwrap()
        }

        let a = first_noisy_fix(7).await;
        let b = first_noisy_fix(7).await;
        assert_eq!(a, b);
        let c = first_noisy_fix(8).await;
        assert_ne!(a, c);
    }
}
