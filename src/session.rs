//! Replay session orchestration.
//!
//! Ties the pipeline together: decoded records are sampled into a plan
//! before any vehicle contact, and a session then owns one link for the
//! whole run: connect, upload, fly, and release on every exit path.

use tracing::info;

use flight_replay_core::mission::MissionPlan;
use flight_replay_core::sample::PositionSample;
use flight_replay_core::sampler;

use crate::config::ReplayConfig;
use crate::controller::{FlightController, FlightPhase};
use crate::error::ReplayError;
use crate::link::VehicleLink;

/// Build the mission plan for a set of decoded position records.
///
/// Fails with [`ReplayError::EmptyLog`] when no usable records were
/// found; callers must not touch the vehicle link in that case.
/// `source` names the log in messages.
pub fn build_plan(
    samples: &[PositionSample],
    source: &str,
    config: &ReplayConfig,
) -> Result<MissionPlan, ReplayError> {
    let path = sampler::sample_path(samples, config.max_mission_items);
    if path.is_empty() {
        return Err(ReplayError::EmptyLog(source.to_string()));
    }
    info!("Generated {} waypoints from {source}", path.len());
    let plan = MissionPlan::from_path(&path, config.cruise_altitude_m, config.max_mission_items)?;
    Ok(plan)
}

/// Upload a mission plan: clear the vehicle's mission, stage every item
/// in order, then commit and await the acknowledgement.
///
/// One shot, no retry; any link failure aborts the run.
pub async fn upload_mission(
    link: &mut dyn VehicleLink,
    plan: &MissionPlan,
) -> Result<(), ReplayError> {
    link.clear_mission().await?;
    for item in plan.items() {
        link.push_mission_item(item).await?;
    }
    info!("Uploading {} waypoints to vehicle", plan.len());
    link.upload_mission().await
}

/// A single replay run against one vehicle link.
///
/// The session owns the link for the duration of the run and releases
/// it on every exit path, including failures part-way through the
/// flight sequence.
pub struct ReplaySession<L: VehicleLink> {
    link: L,
    config: ReplayConfig,
    phase: FlightPhase,
}

impl<L: VehicleLink> ReplaySession<L> {
    pub fn new(link: L, config: ReplayConfig) -> Self {
        Self {
            link,
            config,
            phase: FlightPhase::Idle,
        }
    }

    /// Connect, upload the plan, and fly it.
    ///
    /// The link is closed before this returns, whether or not the
    /// flight succeeded; a flight error takes precedence over a close
    /// error.
    pub async fn run(&mut self, plan: &MissionPlan) -> Result<(), ReplayError> {
        self.link.connect().await?;

        let mut controller = FlightController::new(self.config.clone(), plan.len() as u16);
        let outcome = {
            let link = &mut self.link;
            async {
                upload_mission(&mut *link, plan).await?;
                controller.execute(&mut *link).await
            }
            .await
        };

        info!("Closing vehicle connection");
        let close_result = self.link.close().await;
        controller.mark_closed();
        self.phase = controller.phase();

        outcome?;
        close_result
    }

    /// Phase reached by the last run.
    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    /// Borrow the link, e.g. to inspect simulated vehicle state.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Take the link back after the run.
    pub fn into_link(self) -> L {
        self.link
    }
}
