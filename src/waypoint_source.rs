/**
 * Loads the waypoints of a path from a file.
 */
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::telemetry::{Degrees, Waypoint};

pub trait WaypointSource {
    /**
     * Returns the waypoints in the order they should be visited.
     */
    fn load(&self) -> Result<Vec<Waypoint>>;
}


/**
 * Reads waypoints from an uncompressed KML file, e.g. a path saved from
 * Google Earth.
 */
pub struct KmlWaypointSource {
    path: PathBuf,
}


impl KmlWaypointSource {
    pub fn new<P: AsRef<Path>>(path: P) -> KmlWaypointSource {
        KmlWaypointSource {
            path: path.as_ref().to_path_buf(),
        }
    }
}


impl WaypointSource for KmlWaypointSource {
    fn load(&self) -> Result<Vec<Waypoint>> {
        let file = File::open(&self.path)?;
        parse_kml(BufReader::new(file))
    }
}


/**
 * Reads one "latitude,longitude" pair per line. Blank lines and lines
 * starting with # are skipped.
 */
pub struct TextWaypointSource {
    path: PathBuf,
}


impl TextWaypointSource {
    pub fn new<P: AsRef<Path>>(path: P) -> TextWaypointSource {
        TextWaypointSource {
            path: path.as_ref().to_path_buf(),
        }
    }
}


impl WaypointSource for TextWaypointSource {
    fn load(&self) -> Result<Vec<Waypoint>> {
        let file = File::open(&self.path)?;
        parse_text(BufReader::new(file))
    }
}


/// Picks the loader from the file extension.
pub fn source_for_path<P: AsRef<Path>>(path: P) -> Box<dyn WaypointSource> {
    let is_kml = match path.as_ref().extension() {
        Some(extension) => extension.eq_ignore_ascii_case("kml"),
        None => false,
    };
    if is_kml {
        Box::new(KmlWaypointSource::new(path))
    } else {
        Box::new(TextWaypointSource::new(path))
    }
}


/**
 * Collects every "longitude,latitude[,altitude]" tuple between <coordinates>
 * and </coordinates>. The tags and the tuples may be spread over any number
 * of lines.
 */
pub fn parse_kml<R: BufRead>(reader: R) -> Result<Vec<Waypoint>> {
    let mut waypoints = Vec::new();
    let mut inside_coordinates = false;
    for (index, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line_number = index + 1;
        let mut rest: &str = &line;
        while !rest.is_empty() {
            if !inside_coordinates {
                match rest.find("<coordinates>") {
                    Some(position) => {
                        rest = &rest[position + "<coordinates>".len()..];
                        inside_coordinates = true;
                    }
                    None => break,
                }
            } else {
                let (content, remainder, closed) = match rest.find("</coordinates>") {
                    Some(position) => (
                        &rest[..position],
                        &rest[position + "</coordinates>".len()..],
                        true,
                    ),
                    None => (rest, "", false),
                };
                for tuple in content.split_whitespace() {
                    waypoints.push(parse_kml_tuple(tuple, line_number)?);
                }
                inside_coordinates = !closed;
                rest = remainder;
            }
        }
    }
    debug!("Loaded {} waypoints from KML", waypoints.len());
    Ok(waypoints)
}


fn parse_kml_tuple(tuple: &str, line_number: usize) -> Result<Waypoint> {
    let mut iterator = tuple.split(',');
    let longitude = parse_degrees(iterator.next(), "longitude", line_number)?;
    let latitude = parse_degrees(iterator.next(), "latitude", line_number)?;
    // Altitude, if present, is ignored
    Ok(Waypoint::new(latitude, longitude))
}


pub fn parse_text<R: BufRead>(reader: R) -> Result<Vec<Waypoint>> {
    let mut waypoints = Vec::new();
    for (index, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line_number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut iterator = trimmed.split(',');
        let latitude = parse_degrees(iterator.next(), "latitude", line_number)?;
        let longitude = parse_degrees(iterator.next(), "longitude", line_number)?;
        if let Some(extra) = iterator.next() {
            return Err(Error::WaypointFile {
                line: line_number,
                details: format!("unexpected value '{}'", extra.trim()),
            });
        }
        waypoints.push(Waypoint::new(latitude, longitude));
    }
    debug!("Loaded {} waypoints from text", waypoints.len());
    Ok(waypoints)
}


fn parse_degrees(field: Option<&str>, name: &str, line_number: usize) -> Result<Degrees> {
    let string = match field {
        Some(string) => string.trim(),
        None => {
            return Err(Error::WaypointFile {
                line: line_number,
                details: format!("missing {}", name),
            })
        }
    };
    match string.parse::<Degrees>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(Error::WaypointFile {
            line: line_number,
            details: format!("unable to parse {} '{}'", name, string),
        }),
    }
}


#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{parse_kml, parse_text, source_for_path, WaypointSource};
    use crate::error::Error;
    use crate::telemetry::Waypoint;

    #[test]
    fn test_parse_kml_google_earth_layout() {
        let kml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<kml xmlns=\"http://www.opengis.net/kml/2.2\">
<Document>
  <Placemark>
    <LineString>
      <tessellate>1</tessellate>
      <coordinates>
        -105.185664,40.090583,0 -105.185500,40.090700,0
        -105.185300,40.090900,0
      </coordinates>
    </LineString>
  </Placemark>
</Document>
</kml>
";
        let waypoints = parse_kml(Cursor::new(kml)).unwrap();
        assert!(waypoints == vec![
            Waypoint::new(40.090583, -105.185664),
            Waypoint::new(40.090700, -105.185500),
            Waypoint::new(40.090900, -105.185300),
        ]);
    }

    #[test]
    fn test_parse_kml_single_line() {
        let kml = "<Point><coordinates>11.5,48.1</coordinates></Point><Point><coordinates>12,49,100</coordinates></Point>";
        let waypoints = parse_kml(Cursor::new(kml)).unwrap();
        assert!(waypoints == vec![Waypoint::new(48.1, 11.5), Waypoint::new(49.0, 12.0)]);
    }

    #[test]
    fn test_parse_kml_bad_tuple() {
        let kml = "<coordinates>\n1.0,2.0\n1.0,north\n</coordinates>";
        match parse_kml(Cursor::new(kml)) {
            Err(Error::WaypointFile { line, .. }) => assert!(line == 3),
            other => panic!("Expected a waypoint file error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_kml_without_coordinates() {
        let waypoints = parse_kml(Cursor::new("<kml></kml>")).unwrap();
        assert!(waypoints.is_empty());
    }

    #[test]
    fn test_parse_text() {
        let text = "# Boulder reservoir loop\n40.090583, -105.185664\n\n  40.0907,-105.1855  \n";
        let waypoints = parse_text(Cursor::new(text)).unwrap();
        assert!(waypoints == vec![
            Waypoint::new(40.090583, -105.185664),
            Waypoint::new(40.0907, -105.1855),
        ]);
    }

    #[test]
    fn test_parse_text_errors() {
        match parse_text(Cursor::new("40.0\n")) {
            Err(Error::WaypointFile { line, .. }) => assert!(line == 1),
            other => panic!("Expected a waypoint file error, got {:?}", other),
        }
        match parse_text(Cursor::new("1,2\n1,2,3\n")) {
            Err(Error::WaypointFile { line, .. }) => assert!(line == 2),
            other => panic!("Expected a waypoint file error, got {:?}", other),
        }
        match parse_text(Cursor::new("NaN,2\n")) {
            Err(Error::WaypointFile { line, .. }) => assert!(line == 1),
            other => panic!("Expected a waypoint file error, got {:?}", other),
        }
    }

    #[test]
    fn test_source_for_missing_file() {
        let source = source_for_path("/nonexistent/path.kml");
        match source.load() {
            Err(Error::Io(_)) => (),
            other => panic!("Expected an I/O error, got {:?}", other),
        }
    }
}
