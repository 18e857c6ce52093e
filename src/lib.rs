#[macro_use]
extern crate log;

pub mod error;
pub mod nmea;
pub mod path_config;
pub mod path_simulator;
pub mod position_sink;
pub mod simulation_runner;
pub mod telemetry;
pub mod waypoint_source;
