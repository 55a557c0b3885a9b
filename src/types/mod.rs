pub mod sequence;

pub use sequence::CoordinateSequence;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything with a WGS84 position in degrees
pub trait Position {
    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;
}

/// Bare lat/lon pair (geofence centers and vertices)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_in_range(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl Position for LatLon {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Timestamp as it arrives on the wire: RFC 3339 text or epoch milliseconds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    EpochMillis(i64),
    Text(String),
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(ts: DateTime<Utc>) -> Self {
        RawTimestamp::Text(ts.to_rfc3339())
    }
}

/// Untrusted position report, straight from the ingestion collaborator.
///
/// Nothing here has been checked. The only way to turn it into a [`Coordinate`]
/// is [`crate::validation::CoordinateValidator::validate`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCoordinate {
    pub vehicle_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timestamp: Option<RawTimestamp>,
    pub accuracy: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub altitude: Option<f64>,
    pub battery_level: Option<f64>,
    pub signal_strength: Option<f64>,
}

impl RawCoordinate {
    pub fn new(
        vehicle_id: impl Into<String>,
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            vehicle_id: Some(vehicle_id.into()),
            latitude: Some(latitude),
            longitude: Some(longitude),
            timestamp: Some(timestamp.into()),
            ..Default::default()
        }
    }

    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.accuracy = Some(meters);
        self
    }

    pub fn with_speed(mut self, kmh: f64) -> Self {
        self.speed = Some(kmh);
        self
    }

    pub fn with_heading(mut self, degrees: f64) -> Self {
        self.heading = Some(degrees);
        self
    }

    pub fn with_altitude(mut self, meters: f64) -> Self {
        self.altitude = Some(meters);
        self
    }

    pub fn with_battery_level(mut self, percent: f64) -> Self {
        self.battery_level = Some(percent);
        self
    }

    pub fn with_signal_strength(mut self, percent: f64) -> Self {
        self.signal_strength = Some(percent);
        self
    }
}

impl From<&Coordinate> for RawCoordinate {
    fn from(c: &Coordinate) -> Self {
        Self {
            vehicle_id: Some(c.vehicle_id.clone()),
            latitude: Some(c.latitude),
            longitude: Some(c.longitude),
            timestamp: Some(RawTimestamp::EpochMillis(c.timestamp.timestamp_millis())),
            accuracy: c.accuracy,
            speed: c.speed,
            heading: c.heading,
            altitude: c.altitude,
            battery_level: c.battery_level,
            signal_strength: c.signal_strength,
        }
    }
}

/// Validated, sanitized position report. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    vehicle_id: String,
    latitude: f64,
    longitude: f64,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    altitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    battery_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signal_strength: Option<f64>,
}

/// Field bundle the validator hands to [`Coordinate::from_checked`]
pub(crate) struct CheckedFields {
    pub vehicle_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub accuracy: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub altitude: Option<f64>,
    pub battery_level: Option<f64>,
    pub signal_strength: Option<f64>,
}

impl Coordinate {
    pub(crate) fn from_checked(f: CheckedFields) -> Self {
        Self {
            vehicle_id: f.vehicle_id,
            latitude: f.latitude,
            longitude: f.longitude,
            timestamp: f.timestamp,
            accuracy: f.accuracy,
            speed: f.speed,
            heading: f.heading,
            altitude: f.altitude,
            battery_level: f.battery_level,
            signal_strength: f.signal_strength,
        }
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Accuracy radius in meters
    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    /// Reported speed in km/h
    pub fn speed(&self) -> Option<f64> {
        self.speed
    }

    pub fn heading(&self) -> Option<f64> {
        self.heading
    }

    pub fn altitude(&self) -> Option<f64> {
        self.altitude
    }

    pub fn battery_level(&self) -> Option<f64> {
        self.battery_level
    }

    pub fn signal_strength(&self) -> Option<f64> {
        self.signal_strength
    }

    pub fn lat_lon(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }
}

impl Position for Coordinate {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}
