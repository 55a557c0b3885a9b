//! Fixture builders shared by the unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::types::{CheckedFields, Coordinate, CoordinateSequence, RawCoordinate};
use crate::validation::CoordinateValidator;

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// `t0` plus `secs` seconds
pub(crate) fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

pub(crate) fn coord(vehicle: &str, lat: f64, lon: f64, ts: DateTime<Utc>) -> Coordinate {
    Coordinate::from_checked(CheckedFields {
        vehicle_id: vehicle.to_string(),
        latitude: lat,
        longitude: lon,
        timestamp: ts,
        accuracy: None,
        speed: None,
        heading: None,
        altitude: None,
        battery_level: None,
        signal_strength: None,
    })
}

/// Run a raw report through the default validator with a clock far past `t0`
pub(crate) fn validated(raw: RawCoordinate) -> Coordinate {
    CoordinateValidator::default()
        .validate_at(&raw, at(86_400))
        .unwrap()
        .coordinate
}

pub(crate) fn sequence(coords: Vec<Coordinate>) -> CoordinateSequence {
    CoordinateSequence::new(coords).unwrap()
}
