use crate::error::{Error, Result};
use crate::telemetry::{MetersPerSecond, Seconds, Waypoint};

pub const DEFAULT_SPEED_M_S: MetersPerSecond = 5.0;


/**
 * What happens once the dwell at the final waypoint is over.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EndOfPath {
    /// Jump back to the first waypoint and go again.
    Restart,
    /// Traverse the path backwards.
    Reverse,
    Stop,
}


/**
 * Parameters of one simulation run. Replaced wholesale on every start.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct PathConfig {
    pub waypoints: Vec<Waypoint>,
    pub loop_path: bool,
    pub reverse_loop: bool,
    pub interval_seconds: Seconds,
    pub speed: MetersPerSecond,
}


impl PathConfig {
    pub fn new(waypoints: Vec<Waypoint>) -> PathConfig {
        PathConfig {
            waypoints: waypoints,
            loop_path: false,
            reverse_loop: false,
            interval_seconds: 0,
            speed: DEFAULT_SPEED_M_S,
        }
    }

    pub fn with_loop(mut self, loop_path: bool) -> PathConfig {
        self.loop_path = loop_path;
        self
    }

    pub fn with_reverse_loop(mut self, reverse_loop: bool) -> PathConfig {
        self.reverse_loop = reverse_loop;
        self
    }

    pub fn with_interval_seconds(mut self, interval_seconds: Seconds) -> PathConfig {
        self.interval_seconds = interval_seconds;
        self
    }

    pub fn with_speed(mut self, speed: MetersPerSecond) -> PathConfig {
        self.speed = speed;
        self
    }

    /**
     * Only an empty path is rejected. Degenerate speeds are clamped when the
     * segment timing is computed.
     */
    pub fn validate(&self) -> Result<()> {
        if self.waypoints.is_empty() {
            return Err(Error::InvalidConfig("no waypoints".to_string()));
        }
        Ok(())
    }

    /// Looping takes precedence over reversing when both are set.
    pub fn end_of_path(&self) -> EndOfPath {
        if self.loop_path {
            EndOfPath::Restart
        } else if self.reverse_loop {
            EndOfPath::Reverse
        } else {
            EndOfPath::Stop
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{EndOfPath, PathConfig, DEFAULT_SPEED_M_S};
    use crate::error::Error;
    use crate::telemetry::Waypoint;

    #[test]
    fn test_defaults() {
        let config = PathConfig::new(vec![Waypoint::new(1.0, 2.0)]);
        assert!(!config.loop_path);
        assert!(!config.reverse_loop);
        assert!(config.interval_seconds == 0);
        assert!(config.speed == DEFAULT_SPEED_M_S);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_waypoints_rejected() {
        match PathConfig::new(Vec::new()).validate() {
            Err(Error::InvalidConfig(_)) => (),
            other => panic!("Expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_speed_accepted() {
        let config = PathConfig::new(vec![Waypoint::new(1.0, 2.0)]).with_speed(0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_end_of_path_precedence() {
        let config = PathConfig::new(vec![Waypoint::new(0.0, 0.0)]);
        assert!(config.clone().end_of_path() == EndOfPath::Stop);
        assert!(config.clone().with_loop(true).end_of_path() == EndOfPath::Restart);
        assert!(config.clone().with_reverse_loop(true).end_of_path() == EndOfPath::Reverse);
        assert!(
            config
                .with_loop(true)
                .with_reverse_loop(true)
                .end_of_path()
                == EndOfPath::Restart
        );
    }
}
