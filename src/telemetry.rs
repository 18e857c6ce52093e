use chrono::{DateTime, Utc};

pub type Degrees = f64;
pub type Meter = f64;
pub type MetersPerSecond = f64;
pub type Seconds = u32;

/// Mean Earth radius used for every distance computation.
pub const EARTH_RADIUS_M: Meter = 6_371_000.0;


/**
 * A fixed point the simulated path passes through. Plain degrees, no datum
 * conversion.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Waypoint {
    pub latitude: Degrees,
    pub longitude: Degrees,
}


impl Waypoint {
    pub fn new(latitude: Degrees, longitude: Degrees) -> Waypoint {
        Waypoint {
            latitude: latitude,
            longitude: longitude,
        }
    }
}


/**
 * One simulated position handed to the position sink.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionSample {
    pub latitude: Degrees,
    pub longitude: Degrees,
    pub timestamp: DateTime<Utc>,
}


impl PositionSample {
    pub fn new(waypoint: &Waypoint, timestamp: DateTime<Utc>) -> PositionSample {
        PositionSample {
            latitude: waypoint.latitude,
            longitude: waypoint.longitude,
            timestamp: timestamp,
        }
    }

    pub fn waypoint(&self) -> Waypoint {
        Waypoint::new(self.latitude, self.longitude)
    }
}


/**
 * Great-circle distance between two points using the haversine formula. NaN
 * inputs propagate.
 */
pub fn distance(point_1: &Waypoint, point_2: &Waypoint) -> Meter {
    let phi_1 = point_1.latitude.to_radians();
    let phi_2 = point_2.latitude.to_radians();
    let delta_phi = (point_2.latitude - point_1.latitude).to_radians();
    let delta_lambda = (point_2.longitude - point_1.longitude).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi_1.cos() * phi_2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}


/**
 * Linear interpolation in latitude/longitude space. This is not great-circle
 * accurate, but segments are short. A fraction of 1 or more yields exactly
 * the end point.
 */
pub fn interpolate(start: &Waypoint, end: &Waypoint, fraction: f64) -> Waypoint {
    if fraction >= 1.0 {
        return *end;
    }
    Waypoint {
        latitude: start.latitude + (end.latitude - start.latitude) * fraction,
        longitude: start.longitude + (end.longitude - start.longitude) * fraction,
    }
}


#[cfg(test)]
pub fn assert_approx_eq(value_1: f64, value_2: f64, tolerance: f64) {
    let diff = (value_1 - value_2).abs();
    assert!(
        diff < tolerance,
        "|{} - {}| = {} >= {}",
        value_1,
        value_2,
        diff,
        tolerance
    );
}


#[cfg(test)]
mod tests {
    use super::{assert_approx_eq, distance, interpolate, Waypoint};

    #[test]
    fn test_distance_same_point() {
        let points = [
            Waypoint::new(0.0, 0.0),
            Waypoint::new(40.090583, -105.185664),
            Waypoint::new(-33.8688, 151.2093),
            Waypoint::new(90.0, 0.0),
        ];
        for point in points.iter() {
            assert!(distance(point, point) == 0.0);
        }
    }

    #[test]
    fn test_distance_symmetric() {
        let boulder = Waypoint::new(40.090583, -105.185664);
        let sydney = Waypoint::new(-33.8688, 151.2093);
        let origin = Waypoint::new(0.0, 0.0);

        assert!(distance(&boulder, &sydney) == distance(&sydney, &boulder));
        assert!(distance(&origin, &boulder) == distance(&boulder, &origin));
        assert!(distance(&origin, &sydney) == distance(&sydney, &origin));
    }

    #[test]
    fn test_distance_known_values() {
        // One degree along the equator
        let one_degree = 6_371_000.0 * 1.0f64.to_radians();
        assert_approx_eq(
            distance(&Waypoint::new(0.0, 0.0), &Waypoint::new(0.0, 1.0)),
            one_degree,
            0.001,
        );
        // One degree along a meridian is the same on a sphere
        assert_approx_eq(
            distance(&Waypoint::new(10.0, 20.0), &Waypoint::new(11.0, 20.0)),
            one_degree,
            0.001,
        );
        // Equator to pole
        assert_approx_eq(
            distance(&Waypoint::new(0.0, 0.0), &Waypoint::new(90.0, 0.0)),
            6_371_000.0 * std::f64::consts::FRAC_PI_2,
            0.001,
        );
    }

    #[test]
    fn test_distance_nan_propagates() {
        let point = Waypoint::new(f64::NAN, 0.0);
        assert!(distance(&point, &Waypoint::new(0.0, 0.0)).is_nan());
    }

    #[test]
    fn test_interpolate() {
        let start = Waypoint::new(0.1, 10.0);
        let end = Waypoint::new(0.3, 12.0);

        assert!(interpolate(&start, &end, 0.0) == start);
        assert!(interpolate(&start, &end, 1.0) == end);
        assert!(interpolate(&start, &end, 1.5) == end);

        let halfway = interpolate(&start, &end, 0.5);
        assert_approx_eq(halfway.latitude, 0.2, 1e-12);
        assert_approx_eq(halfway.longitude, 11.0, 1e-12);
    }
}
