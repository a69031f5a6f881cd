use std::fmt;

use geo_types::{Coord, Geometry, LineString, Point};
use serde::{Deserialize, Serialize};

use crate::error::{empty_track_error, invalid_coordinate_error, Error};

/// WGS84.
pub const SRID: i32 = 4326;

/// A (latitude, longitude) pair as callers supply it.
///
/// Geometries built from it are stored the other way around: x is the
/// longitude and y the latitude.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn to_point(&self) -> Result<Point<f64>, Error> {
        point_from(self.latitude, self.longitude)
    }
}

impl From<Point<f64>> for Coordinates {
    fn from(point: Point<f64>) -> Self {
        Self {
            latitude: point.y(),
            longitude: point.x(),
        }
    }
}

pub fn point_from(latitude: f64, longitude: f64) -> Result<Point<f64>, Error> {
    let coordinates = Coordinates::new(latitude, longitude);

    if !coordinates.is_valid() {
        return Err(invalid_coordinate_error(latitude, longitude));
    }

    Ok(Point::new(longitude, latitude))
}

/// Query geometry built from a GPS track: a point for a single fix, a
/// linestring otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct Track(Geometry<f64>);

/// Builds a track from ordered fixes. Order is preserved and nothing is
/// deduplicated or simplified.
pub fn path_from(points: &[Coordinates]) -> Result<Track, Error> {
    let coords = points
        .iter()
        .map(|c| c.to_point().map(|p| Coord { x: p.x(), y: p.y() }))
        .collect::<Result<Vec<_>, _>>()?;

    match coords.as_slice() {
        [] => Err(empty_track_error()),
        [single] => Ok(Track(Geometry::Point(Point::from(*single)))),
        _ => Ok(Track(Geometry::LineString(LineString::new(coords)))),
    }
}

impl Track {
    pub fn into_geometry(self) -> Geometry<f64> {
        self.0
    }

    /// Number of fixes, repeated ones included.
    pub fn fix_count(&self) -> usize {
        match &self.0 {
            Geometry::LineString(line) => line.0.len(),
            _ => 1,
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_ewkt(f, &self.0)
    }
}

/// Extended WKT with the SRID prefix, coordinates in (lon lat) order.
///
/// Floats go through `Display`, which prints the shortest string that
/// parses back to the same value.
pub fn to_ewkt(geometry: &Geometry<f64>) -> String {
    struct Ewkt<'a>(&'a Geometry<f64>);

    impl fmt::Display for Ewkt<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write_ewkt(f, self.0)
        }
    }

    Ewkt(geometry).to_string()
}

fn write_ewkt(f: &mut fmt::Formatter<'_>, geometry: &Geometry<f64>) -> fmt::Result {
    write!(f, "SRID={};", SRID)?;

    match geometry {
        Geometry::Point(point) => write!(f, "POINT({} {})", point.x(), point.y()),
        Geometry::LineString(line) => {
            write!(f, "LINESTRING(")?;
            for (i, coord) in line.coords().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{} {}", coord.x, coord.y)?;
            }
            write!(f, ")")
        }
        _ => Err(fmt::Error),
    }
}

#[test]
fn point_from_checks_ranges() {
    assert!(point_from(90.0, 180.0).is_ok());
    assert!(point_from(-90.0, -180.0).is_ok());
    assert_eq!(point_from(90.5, 0.0).unwrap_err().code, 102);
    assert_eq!(point_from(0.0, -180.1).unwrap_err().code, 102);
    assert_eq!(point_from(f64::NAN, 0.0).unwrap_err().code, 102);
}

#[test]
fn point_from_swaps_to_lon_lat() {
    let point = point_from(52.52, 13.405).unwrap();

    assert_eq!(point.x(), 13.405);
    assert_eq!(point.y(), 52.52);
    assert_eq!(Coordinates::from(point), Coordinates::new(52.52, 13.405));
}

#[test]
fn path_from_builds_point_or_linestring() {
    let single = path_from(&[Coordinates::new(52.52, 13.405)]).unwrap();
    assert_eq!(single.fix_count(), 1);
    assert!(matches!(single.clone().into_geometry(), Geometry::Point(_)));
    assert_eq!(single.to_string(), "SRID=4326;POINT(13.405 52.52)");

    let track = path_from(&[
        Coordinates::new(52.5200, 13.4050),
        Coordinates::new(52.5203, 13.4053),
        Coordinates::new(52.5203, 13.4053),
        Coordinates::new(52.5206, 13.4056),
    ])
    .unwrap();

    assert_eq!(track.fix_count(), 4);
    assert_eq!(
        track.to_string(),
        "SRID=4326;LINESTRING(13.405 52.52,13.4053 52.5203,13.4053 52.5203,13.4056 52.5206)"
    );
}

#[test]
fn path_from_rejects_empty_and_invalid_tracks() {
    assert_eq!(path_from(&[]).unwrap_err().code, 104);
    assert_eq!(
        path_from(&[Coordinates::new(0.0, 0.0), Coordinates::new(0.0, 200.0)])
            .unwrap_err()
            .code,
        102
    );
}

#[test]
fn ewkt_keeps_full_precision() {
    let point = point_from(52.520008123456789, 13.404954987654321).unwrap();
    let ewkt = to_ewkt(&Geometry::Point(point));

    let body = ewkt
        .trim_start_matches("SRID=4326;POINT(")
        .trim_end_matches(')');
    let mut parts = body.split(' ').map(|s| s.parse::<f64>().unwrap());

    assert_eq!(parts.next(), Some(point.x()));
    assert_eq!(parts.next(), Some(point.y()));
}
