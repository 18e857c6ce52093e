/**
 * Formats simulated positions as NMEA 0183 sentences, the way a serial GPS
 * receiver would report them.
 */

use crate::telemetry::{Degrees, PositionSample};

// Reported fix quality. The positions are exact, so these are nominal.
const FIX_QUALITY: u8 = 1;
const SATELLITES_IN_USE: u8 = 8;
const HORIZONTAL_DILUTION_OF_PRECISION: f32 = 0.9;


/**
 * XOR of every byte between the leading '$' and the '*'.
 */
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0u8, |accumulator, byte| accumulator ^ byte)
}


/// ddmm.mmmm,N
pub fn format_latitude(latitude: Degrees) -> String {
    let hemisphere = if latitude < 0.0 { 'S' } else { 'N' };
    let (degrees, minutes) = degrees_minutes(latitude.abs());
    format!("{:02}{:07.4},{}", degrees, minutes, hemisphere)
}


/// dddmm.mmmm,E
pub fn format_longitude(longitude: Degrees) -> String {
    let hemisphere = if longitude < 0.0 { 'W' } else { 'E' };
    let (degrees, minutes) = degrees_minutes(longitude.abs());
    format!("{:03}{:07.4},{}", degrees, minutes, hemisphere)
}


/**
 * Splits an absolute angle into whole degrees and minutes. Minutes are
 * rounded to the precision we print, so 59.99999 carries into the degrees
 * instead of printing as 60.0000.
 */
fn degrees_minutes(value: Degrees) -> (u32, f64) {
    let mut degrees = value.trunc();
    let mut minutes = ((value - degrees) * 60.0 * 10_000.0).round() / 10_000.0;
    if minutes >= 60.0 {
        degrees += 1.0;
        minutes -= 60.0;
    }
    (degrees as u32, minutes)
}


/**
 * GGA: Global positioning system fix data. Coordinates that a receiver could
 * never report are rejected rather than formatted.
 */
pub fn gga_sentence(sample: &PositionSample) -> Result<String, String> {
    if !sample.latitude.is_finite() || sample.latitude.abs() > 90.0 {
        return Err(format!("Latitude out of range: {}", sample.latitude));
    }
    if !sample.longitude.is_finite() || sample.longitude.abs() > 180.0 {
        return Err(format!("Longitude out of range: {}", sample.longitude));
    }
    let body = format!(
        "GPGGA,{time},{latitude},{longitude},{quality},{satellites:02},{hdop:.1},0.0,M,0.0,M,,",
        time = sample.timestamp.format("%H%M%S%.3f"),
        latitude = format_latitude(sample.latitude),
        longitude = format_longitude(sample.longitude),
        quality = FIX_QUALITY,
        satellites = SATELLITES_IN_USE,
        hdop = HORIZONTAL_DILUTION_OF_PRECISION,
    );
    let sum = checksum(&body);
    Ok(format!("${}*{:02X}\r\n", body, sum))
}


#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{checksum, format_latitude, format_longitude, gga_sentence};
    use crate::telemetry::{PositionSample, Waypoint};

    #[test]
    fn test_checksum() {
        // The canonical example from the NMEA documentation
        let body = "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
        assert!(checksum(body) == 0x47);
        assert!(checksum("") == 0);
    }

    #[test]
    fn test_format_latitude() {
        assert!(format_latitude(48.1173) == "4807.0380,N");
        assert!(format_latitude(-33.5) == "3330.0000,S");
        assert!(format_latitude(0.0) == "0000.0000,N");
        assert!(format_latitude(5.0 / 60.0) == "0005.0000,N");
    }

    #[test]
    fn test_format_longitude() {
        assert!(format_longitude(11.0 + 31.0 / 60.0) == "01131.0000,E");
        assert!(format_longitude(-105.5) == "10530.0000,W");
        assert!(format_longitude(151.0) == "15100.0000,E");
    }

    #[test]
    fn test_minutes_carry() {
        // 59.999999 minutes rounds to 60, which must carry
        assert!(format_latitude(40.0 + 59.999999 / 60.0) == "4100.0000,N");
    }

    #[test]
    fn test_gga_sentence() {
        let timestamp = Utc.with_ymd_and_hms(2015, 6, 20, 12, 35, 19).unwrap();
        let sample = PositionSample::new(&Waypoint::new(48.1173, 11.0 + 31.0 / 60.0), timestamp);
        let sentence = gga_sentence(&sample).unwrap();

        assert!(sentence.starts_with("$GPGGA,123519.000,4807.0380,N,01131.0000,E,1,08,0.9,"));
        assert!(sentence.ends_with("\r\n"));

        let star = sentence.find('*').unwrap();
        let body = &sentence[1..star];
        let reported = u8::from_str_radix(&sentence[star + 1..star + 3], 16).unwrap();
        assert!(reported == checksum(body));
    }

    #[test]
    fn test_gga_sentence_rejects_impossible_coordinates() {
        let timestamp = Utc.with_ymd_and_hms(2015, 6, 20, 12, 35, 19).unwrap();
        let bad = [
            Waypoint::new(f64::NAN, 11.0),
            Waypoint::new(48.0, f64::NAN),
            Waypoint::new(f64::INFINITY, 11.0),
            Waypoint::new(90.5, 11.0),
            Waypoint::new(-91.0, 11.0),
            Waypoint::new(48.0, 180.5),
        ];
        for waypoint in bad.iter() {
            assert!(gga_sentence(&PositionSample::new(waypoint, timestamp)).is_err());
        }

        // The extremes are still valid
        assert!(gga_sentence(&PositionSample::new(&Waypoint::new(90.0, -180.0), timestamp)).is_ok());
    }
}
