//! GPS telemetry validation and movement analytics for vehicle fleets.
//!
//! Raw reports enter through [`CoordinateValidator`], which is the only way to
//! obtain a [`Coordinate`]. Validated per-vehicle histories then feed the
//! movement segmenter, the anomaly detector, the quality scorer and geofence
//! compliance. All components are stateless except [`StreamingValidator`] and
//! [`GeofenceTracker`], which the caller owns.

pub mod anomaly;
pub mod config;
pub mod error;
pub mod fleet;
pub mod geofence;
pub mod geometry;
pub mod quality;
pub mod segmentation;
pub mod streaming;
pub mod types;
pub mod validation;

#[cfg(test)]
mod test_support;

use chrono::{DateTime, Utc};

pub use anomaly::{
    AnomalyConfig, AnomalyDetector, AnomalyPolicy, AnomalyReport, PatternFinding, PatternType,
    Recommendation, Severity,
};
pub use config::EngineConfig;
pub use error::{GeofenceErrors, Result, TelemetryError, ValidationErrors, Violation, ViolationClass};
pub use fleet::{analyze_fleet, FleetReport, FleetTotals, VehicleReport};
pub use geofence::{
    ComplianceReport, Geofence, GeofenceDraft, GeofenceEvent, GeofenceEventKind, GeofenceKind,
    GeofenceShape, GeofenceTracker, ValidatedGeofence, ViolationPolicy,
};
pub use quality::{BatchQuality, QualityAssessment, QualityConfig, QualityGate, QualityLevel, QualityScorer};
pub use segmentation::{
    MovementSegment, MovementSegmenter, MovementTotals, SegmentKind, SegmentationResult,
    SegmenterConfig, Stop,
};
pub use streaming::{IngestOutcome, StreamingValidator};
pub use types::{Coordinate, CoordinateSequence, LatLon, Position, RawCoordinate, RawTimestamp};
pub use validation::{BatchValidation, BatchWarnings, CoordinateValidator, Validated, ValidatorConfig};

/// Validate one raw report with default thresholds
pub fn validate_coordinate(raw: &RawCoordinate) -> std::result::Result<Validated, ValidationErrors> {
    CoordinateValidator::default().validate(raw)
}

/// Validate a batch with default thresholds; rejected entries are listed, not fatal
pub fn validate_batch(raws: &[RawCoordinate]) -> BatchValidation {
    CoordinateValidator::default().validate_batch(raws)
}

pub fn segment_movement(sequence: &CoordinateSequence) -> SegmentationResult {
    MovementSegmenter::default().segment(sequence)
}

pub fn detect_anomalies(sequence: &CoordinateSequence) -> AnomalyReport {
    AnomalyDetector::default().detect(sequence)
}

/// Compliance of `coordinates` against one fence inside an inclusive window
pub fn evaluate_geofence(
    coordinates: &[Coordinate],
    geofence: &Geofence,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> ComplianceReport {
    geofence::evaluate(coordinates, geofence, window_start, window_end)
}

pub fn score_quality(coordinate: &Coordinate, previous: Option<&Coordinate>) -> QualityAssessment {
    QualityScorer::default().score(coordinate, previous)
}
