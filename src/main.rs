//! Replay a recorded flight against a simulated vehicle.
//!
//! Usage:
//!   flight_replay [TLOG] [CONFIG.json]
//!
//! TLOG defaults to `flight.tlog`. The vehicle is simulated in-process
//! and homed at the first recorded waypoint.

use std::path::Path;
use std::process::ExitCode;

use tracing::{error, info};

use flight_replay::config::ReplayConfig;
use flight_replay::error::ReplayError;
use flight_replay::link::sim::{SimVehicle, SimVehicleConfig};
use flight_replay::session::{build_plan, ReplaySession};
use flight_replay::tlog::TlogReader;
use flight_replay_core::sample::PositionSample;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().init();

    let tlog = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "flight.tlog".to_string());
    let config = match std::env::args().nth(2) {
        Some(path) => match ReplayConfig::from_file(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => ReplayConfig::default(),
    };

    match replay(&tlog, config).await {
        Ok(()) => {
            info!("Completed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Replay failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn replay(tlog: &str, config: ReplayConfig) -> Result<(), ReplayError> {
    info!("Generating waypoints from {tlog}");
    let samples: Vec<PositionSample> = TlogReader::open(tlog)?.collect();
    let plan = build_plan(&samples, tlog, &config)?;

    // Home the simulated vehicle at the start of the recorded path.
    let home = plan.items()[0].position();
    let vehicle = SimVehicle::at_home(home, SimVehicleConfig::default());

    let mut session = ReplaySession::new(vehicle, config);
    session.run(&plan).await
}
