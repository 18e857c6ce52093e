#[macro_use]
extern crate log;

use getopts::{Matches, Options};
use simplelog::{Config, LevelFilter, WriteLogger};
use std::io;
use std::process::exit;

use gps_path_simulator::path_config::{PathConfig, DEFAULT_SPEED_M_S};
use gps_path_simulator::position_sink::{LogSink, NmeaSink};
use gps_path_simulator::simulation_runner::{spawn_simulator, RunEvent, SimulatorHandle, TICK_PERIOD};
use gps_path_simulator::telemetry::{MetersPerSecond, Seconds};
use gps_path_simulator::waypoint_source::source_for_path;


fn main() {
    let matches = match handle_opts() {
        Some(matches) => matches,
        None => return,
    };
    info!("Starting up");

    let config = match path_config(&matches) {
        Ok(config) => config,
        Err(message) => {
            error!("{}", message);
            exit(1);
        }
    };

    let handle = if matches.opt_present("n") {
        spawn_simulator(NmeaSink::new(io::stdout()), TICK_PERIOD)
    } else {
        spawn_simulator(LogSink, TICK_PERIOD)
    };

    let status = match handle.start(config) {
        Ok(_) => wait_for_run(&handle),
        Err(e) => {
            error!("Unable to start simulation: {}", e);
            1
        }
    };
    handle.shutdown();

    info!("Main thread shutting down");
    exit(status);
}


/**
 * Blocks until the run ends and returns the process exit status.
 */
fn wait_for_run(handle: &SimulatorHandle) -> i32 {
    match handle.events().recv() {
        Ok(RunEvent::Finished) => {
            info!("Reached the end of the path");
            0
        }
        Ok(RunEvent::Failed(e)) => {
            error!("Simulation failed: {}", e);
            1
        }
        Err(_) => {
            error!("Simulation thread exited unexpectedly");
            1
        }
    }
}


fn path_config(matches: &Matches) -> Result<PathConfig, String> {
    let file_name = match matches.opt_str("w") {
        Some(file_name) => file_name,
        None => return Err("No waypoint file given, use --waypoints".to_string()),
    };
    let waypoints = match source_for_path(&file_name).load() {
        Ok(waypoints) => waypoints,
        Err(e) => return Err(format!("Unable to load waypoints from {}: {}", file_name, e)),
    };

    let speed: MetersPerSecond = match matches.opt_str("s") {
        Some(value) => match value.parse() {
            Ok(speed) => speed,
            Err(e) => return Err(format!("Invalid speed '{}': {}", value, e)),
        },
        None => DEFAULT_SPEED_M_S,
    };
    let interval: Seconds = match matches.opt_str("i") {
        Some(value) => match value.parse() {
            Ok(interval) => interval,
            Err(e) => return Err(format!("Invalid interval '{}': {}", value, e)),
        },
        None => 0,
    };

    Ok(PathConfig::new(waypoints)
        .with_speed(speed)
        .with_interval_seconds(interval)
        .with_loop(matches.opt_present("l"))
        .with_reverse_loop(matches.opt_present("r")))
}


fn handle_opts() -> Option<Matches> {
    let mut opts = Options::new();
    opts.optopt("w", "waypoints", "Waypoint file, KML or one lat,lon per line.", "FILE");
    opts.optopt("s", "speed", "Travel speed in meters per second.", "M/S");
    opts.optopt("i", "interval", "Seconds to wait at each waypoint.", "SECONDS");
    opts.optflag("l", "loop", "Restart from the first waypoint at the end.");
    opts.optflag("r", "reverse-loop", "Travel back along the path at the end.");
    opts.optflag("n", "nmea", "Write NMEA sentences to stdout.");
    opts.optflag("v", "verbose", "Prints extra logging.");
    opts.optflag("h", "help", "Print this help menu.");
    let mut args = std::env::args();
    args.next();  // Skip the program name
    let matches = match opts.parse(args) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Unable to parse options: {}", e);
            print_usage(&opts);
            exit(2);
        }
    };
    if matches.opt_present("h") {
        print_usage(&opts);
        return None;
    }

    let level = if matches.opt_present("v") {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };

    // Log to stderr so that NMEA output on stdout stays clean
    match WriteLogger::init(level, Config::default(), io::stderr()) {
        Ok(_) => (),
        Err(e) => panic!("Unable to initialize logger: {}", e),
    };
    Some(matches)
}


fn print_usage(opts: &Options) {
    let brief = "Usage: gps-path-simulator --waypoints FILE [options]";
    print!("{}", opts.usage(&brief));
}
