mod backends;
mod bus;
mod error;
mod lock;
mod orientation;
mod policy;
mod state;

use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::backends::hyprland::{self, HyprlandBackend};
use crate::bus::{SensorBus, SensorSource};
use crate::orientation::TransformTable;
use crate::policy::LayoutMode;
use crate::state::{OrientationSource, Rotator};

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn flag(matches: &ArgMatches, name: &str) -> bool {
    matches.get_one::<bool>(name).copied().unwrap_or(false)
}

fn main() -> ExitCode {
    init_logging();

    let matches = Command::new("iio-rotate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("automatic display rotation for Hyprland driven by the iio-sensor-proxy accelerometer")
        .arg(
            Arg::new("output")
                .value_name("OUTPUT")
                .default_value("eDP-1")
                .help("Output to rotate"),
        )
        .arg(
            Arg::new("left-master")
                .long("left-master")
                .action(ArgAction::SetTrue)
                .conflicts_with("right-master")
                .help("Also re-orient the master layout, master area on the left"),
        )
        .arg(
            Arg::new("right-master")
                .long("right-master")
                .action(ArgAction::SetTrue)
                .help("Also re-orient the master layout, master area on the right"),
        )
        .arg(
            Arg::new("flip-bottom-up")
                .long("flip-bottom-up")
                .action(ArgAction::SetTrue)
                .help("Swap the normal and bottom-up readings"),
        )
        .arg(
            Arg::new("transform")
                .long("transform")
                .value_name("N,E,S,W")
                .default_value("0,1,2,3")
                .help("Transform per orientation (normal,left-up,bottom-up,right-up)"),
        )
        .get_matches();

    let output = matches.get_one::<String>("output").unwrap().clone();
    let flip_bottom_up = flag(&matches, "flip-bottom-up");
    let mode = if flag(&matches, "left-master") {
        LayoutMode::LeftMaster
    } else if flag(&matches, "right-master") {
        LayoutMode::RightMaster
    } else {
        LayoutMode::Disabled
    };
    let table: TransformTable = match matches.get_one::<String>("transform").unwrap().parse() {
        Ok(table) => table,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let bus = match SensorBus::connect() {
        Ok(bus) => bus,
        Err(e) => {
            error!("cannot claim the accelerometer: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let unlocked = Arc::new(AtomicBool::new(true));
    if let Err(e) = lock::spawn_toggle_listener(unlocked.clone()) {
        error!("cannot listen for SIGUSR1: {}", e);
        return ExitCode::FAILURE;
    }

    // The workspace m[...] rule wants the monitor id, not the name.
    // Failing here still releases the accelerometer claim on drop.
    let monitor_id = match hyprland::resolve_monitor_id(&output) {
        Ok(id) => id,
        Err(e) => {
            error!("cannot resolve the monitor id of {}: {}", output, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = bus.subscribe() {
        error!("cannot subscribe to orientation changes: {}", e);
        return ExitCode::FAILURE;
    }

    let sink = HyprlandBackend::new(output.clone(), monitor_id);
    let mut rotator = Rotator::new(sink, table, mode, unlocked);
    let mut source = SensorSource::new(&bus, flip_bottom_up);

    let (events_tx, events_rx) = mpsc::channel();
    let reader = bus.spawn_reader(events_tx);

    // Apply the already-settled orientation right away, without the
    // settle delay, so a restarted daemon matches a display that was
    // rotated before it came up.
    if let Some(current) = source.current_orientation() {
        rotator.observe(current);
    }

    info!("watching {} for orientation changes", output);
    state::run(&mut rotator, &mut source, &events_rx);

    info!("bus connection ended, shutting down");
    let _ = reader.join();
    ExitCode::SUCCESS
}
