//! Scripted flight sequence.
//!
//! Drives a vehicle through the replay: guided mode, arming, takeoff,
//! AUTO mission start, a timed monitoring loop, then return to launch.
//! Every wait is a bounded sleep-then-recheck loop against state the
//! link reports; the controller never blocks on a push notification, and
//! each phase only ends once the requested state is observed.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::info;

use flight_replay_core::geo;

use crate::config::ReplayConfig;
use crate::error::ReplayError;
use crate::link::{VehicleLink, VehicleMode};

/// Phases of the replay flight, in execution order.
///
/// There are no reverse transitions; a failed phase aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPhase {
    Idle,
    ModeGuided,
    Armed,
    Ascending,
    MissionReady,
    MissionRunning,
    ReturningToLaunch,
    Closed,
}

/// What a convergence pass waits for.
#[derive(Debug, Clone, Copy)]
enum ConvergenceTarget {
    Mode(VehicleMode),
    Armed(bool),
}

/// One request-until-observed pass against the vehicle link.
///
/// Mode and arming changes are asynchronous on the vehicle side and may
/// be delayed or dropped, so a single request is not enough: the request
/// is re-issued and the matching accessor polled until the vehicle
/// reports the wanted state. `timeout` bounds the whole pass, so a
/// vehicle that never confirms fails the run instead of stalling it.
struct Convergence {
    interval: Duration,
    timeout: Duration,
    what: &'static str,
}

impl Convergence {
    async fn run(
        &self,
        link: &mut dyn VehicleLink,
        target: ConvergenceTarget,
    ) -> Result<(), ReplayError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let observed = match target {
                ConvergenceTarget::Mode(mode) => {
                    link.request_mode(mode).await?;
                    link.mode().await? == mode
                }
                ConvergenceTarget::Armed(armed) => {
                    link.request_armed(armed).await?;
                    link.armed().await? == armed
                }
            };
            if observed {
                return Ok(());
            }
            info!("Waiting for {}", self.what);
            if Instant::now() + self.interval > deadline {
                return Err(ReplayError::Timeout(self.what));
            }
            sleep(self.interval).await;
        }
    }
}

/// Distance from the vehicle to the waypoint it is heading toward.
///
/// The mission cursor is one ahead of the uploaded item index: cursor
/// `n` means the vehicle is flying toward uploaded item `n - 1`, and
/// cursor 0 means there is no target yet (still at the home slot), for
/// which `None` is returned.
pub async fn distance_to_current_waypoint(
    link: &mut dyn VehicleLink,
) -> Result<Option<f64>, ReplayError> {
    let cursor = link.mission_current().await?;
    distance_for_cursor(link, cursor).await
}

async fn distance_for_cursor(
    link: &mut dyn VehicleLink,
    cursor: u16,
) -> Result<Option<f64>, ReplayError> {
    if cursor == 0 {
        return Ok(None);
    }
    let item = link.mission_item(cursor - 1).await?;
    let position = link.global_position().await?;
    Ok(Some(geo::distance_metres(position, item.position())))
}

/// Drives a vehicle through the scripted replay sequence.
///
/// Phases run strictly in order; the current phase is observable through
/// [`FlightController::phase`] and never moves backwards.
pub struct FlightController {
    config: ReplayConfig,
    phase: FlightPhase,
    mission_len: u16,
}

impl FlightController {
    /// Create a controller for a mission of `mission_len` items.
    pub fn new(config: ReplayConfig, mission_len: u16) -> Self {
        Self {
            config,
            phase: FlightPhase::Idle,
            mission_len,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    /// Run the whole sequence against an already-uploaded mission.
    ///
    /// The link is left open; connection release belongs to the caller.
    pub async fn execute(&mut self, link: &mut dyn VehicleLink) -> Result<(), ReplayError> {
        self.enter_guided(link).await?;
        self.arm(link).await?;
        self.takeoff(link).await?;
        self.start_mission(link).await?;
        self.monitor_mission(link).await?;
        self.return_to_launch(link).await
    }

    /// Mark the connection released.
    pub fn mark_closed(&mut self) {
        self.phase = FlightPhase::Closed;
    }

    /// Switch the vehicle to GUIDED for arming and takeoff.
    pub async fn enter_guided(&mut self, link: &mut dyn VehicleLink) -> Result<(), ReplayError> {
        info!("Switching to {} mode", VehicleMode::Guided);
        self.converge_mode(link, VehicleMode::Guided, "GUIDED mode")
            .await?;
        self.phase = FlightPhase::ModeGuided;
        Ok(())
    }

    /// Arm the vehicle.
    pub async fn arm(&mut self, link: &mut dyn VehicleLink) -> Result<(), ReplayError> {
        info!("Arming vehicle");
        Convergence {
            interval: self.config.arm_poll(),
            timeout: self.config.convergence_timeout(),
            what: "arming",
        }
        .run(link, ConvergenceTarget::Armed(true))
        .await?;
        self.phase = FlightPhase::Armed;
        Ok(())
    }

    /// Take off and climb until the target altitude is effectively
    /// reached.
    ///
    /// "Effectively" is a configured fraction of the target (0.95 by
    /// default): waiting for exact equality could stall forever on
    /// sensor noise or overshoot avoidance.
    pub async fn takeoff(&mut self, link: &mut dyn VehicleLink) -> Result<(), ReplayError> {
        let target = self.config.cruise_altitude_m;
        info!("Taking off to {target} m");
        link.takeoff(target).await?;
        self.phase = FlightPhase::Ascending;

        let required = target * self.config.takeoff_fraction;
        let poll = self.config.climb_poll();
        let deadline = Instant::now() + self.config.convergence_timeout();
        loop {
            let alt = link.relative_altitude().await?;
            if alt >= required {
                info!("Reached target altitude of ~{target} m");
                break;
            }
            info!("Altitude: {alt:.1} < {required:.1}");
            if Instant::now() + poll > deadline {
                return Err(ReplayError::Timeout("takeoff altitude"));
            }
            sleep(poll).await;
        }
        self.phase = FlightPhase::MissionReady;
        Ok(())
    }

    /// Rewind the mission cursor and switch to AUTO.
    pub async fn start_mission(&mut self, link: &mut dyn VehicleLink) -> Result<(), ReplayError> {
        info!("Starting mission");
        link.set_mission_current(0).await?;
        self.converge_mode(link, VehicleMode::Auto, "AUTO mode")
            .await?;
        self.phase = FlightPhase::MissionRunning;
        Ok(())
    }

    /// Watch mission progress for the configured budget.
    ///
    /// Ends early once the cursor reaches the mission length: the
    /// vehicle is then heading for the final waypoint and the rest of
    /// the run is just the approach. Otherwise the loop runs out its
    /// budget; either way the flight proceeds to return-to-launch.
    pub async fn monitor_mission(&mut self, link: &mut dyn VehicleLink) -> Result<(), ReplayError> {
        let budget = self.config.monitor_budget();
        let poll = self.config.monitor_poll();
        let started = Instant::now();
        while started.elapsed() < budget {
            let cursor = link.mission_current().await?;
            match distance_for_cursor(link, cursor).await? {
                Some(d) => info!("Distance to waypoint ({cursor}): {d:.1} m"),
                None => info!("Distance to waypoint ({cursor}): n/a"),
            }
            if cursor == self.mission_len {
                info!("Heading for the final waypoint; ending monitoring");
                break;
            }
            sleep(poll).await;
        }
        Ok(())
    }

    /// Bring the vehicle home.
    pub async fn return_to_launch(
        &mut self,
        link: &mut dyn VehicleLink,
    ) -> Result<(), ReplayError> {
        info!("Return to launch");
        self.converge_mode(link, VehicleMode::Rtl, "RTL mode").await?;
        self.phase = FlightPhase::ReturningToLaunch;
        Ok(())
    }

    async fn converge_mode(
        &self,
        link: &mut dyn VehicleLink,
        mode: VehicleMode,
        what: &'static str,
    ) -> Result<(), ReplayError> {
        Convergence {
            interval: self.config.mode_poll(),
            timeout: self.config.convergence_timeout(),
            what,
        }
        .run(link, ConvergenceTarget::Mode(mode))
        .await
    }
}
