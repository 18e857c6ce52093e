use std::fmt;
use std::io;


/**
 * Everything that can go wrong while configuring or running a simulation.
 */
#[derive(Debug)]
pub enum Error {
    /// The run parameters were rejected by `start`; nothing changed.
    InvalidConfig(String),
    /// The position sink can no longer accept samples. The run is stopped.
    SinkUnavailable(String),
    /// A waypoint file could not be parsed.
    WaypointFile { line: usize, details: String },
    Io(io::Error),
    /// The simulation thread has exited.
    Disconnected,
}


pub type Result<T> = std::result::Result<T, Error>;


impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(details) => write!(f, "Invalid path configuration: {}", details),
            Error::SinkUnavailable(details) => write!(f, "Position sink unavailable: {}", details),
            Error::WaypointFile { line, details } => {
                write!(f, "Invalid waypoint file at line {}: {}", line, details)
            }
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Disconnected => write!(f, "Simulation thread is not running"),
        }
    }
}


impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}


impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}
