//! Coordinate validation and sanitization.
//!
//! [`CoordinateValidator`] is the only way to turn a [`RawCoordinate`] into a
//! [`Coordinate`]. Every rule is checked on every call so callers get the full list
//! of problems in one round trip.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationErrors, Violation, ViolationClass};
use crate::types::{CheckedFields, Coordinate, Position, RawCoordinate, RawTimestamp};

/// Decimal places kept on latitude/longitude (~1.1 mm)
pub const COORDINATE_DECIMALS: i32 = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidatorConfig {
    /// How far in the future a timestamp may be before it is rejected (seconds)
    pub max_future_skew_secs: i64,
    /// Upper bound on reported accuracy (meters)
    pub max_accuracy_m: f64,
    /// Reject on optional-field range violations instead of returning them as warnings
    pub strict_ranges: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_future_skew_secs: 5 * 60,
            max_accuracy_m: 1000.0,
            strict_ranges: true,
        }
    }
}

/// Accepted coordinate plus any range warnings tolerated by a lenient config
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validated {
    pub coordinate: Coordinate,
    pub warnings: Vec<Violation>,
}

/// Batch-level data quality counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchWarnings {
    /// Entries repeating an earlier (vehicleId, timestamp) pair
    pub duplicates: usize,
    /// Entries older than the previous accepted entry of the same vehicle
    pub out_of_sequence_count: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchValidation {
    pub validated: Vec<Coordinate>,
    /// Input index and reasons for every rejected entry
    pub rejected: Vec<(usize, ValidationErrors)>,
    pub warnings: BatchWarnings,
}

#[derive(Debug, Clone, Default)]
pub struct CoordinateValidator {
    config: ValidatorConfig,
}

impl CoordinateValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate against the wall clock
    pub fn validate(&self, raw: &RawCoordinate) -> Result<Validated, ValidationErrors> {
        self.validate_at(raw, Utc::now())
    }

    /// Validate with an explicit "now" for the future-timestamp rule
    pub fn validate_at(
        &self,
        raw: &RawCoordinate,
        now: DateTime<Utc>,
    ) -> Result<Validated, ValidationErrors> {
        let mut violations = Vec::new();

        let vehicle_id = raw.vehicle_id.as_deref().map(str::trim).unwrap_or("");
        if vehicle_id.is_empty() {
            violations.push(Violation::structural("vehicleId", "is required and must not be blank"));
        }

        let latitude = check_required_range(raw.latitude, "latitude", -90.0, 90.0, &mut violations);
        let longitude =
            check_required_range(raw.longitude, "longitude", -180.0, 180.0, &mut violations);

        let timestamp = match raw.timestamp.as_ref() {
            None => {
                violations.push(Violation::structural("timestamp", "is required"));
                None
            }
            Some(ts) => match parse_timestamp(ts) {
                None => {
                    violations.push(Violation::structural("timestamp", "is not a valid ISO-8601 instant"));
                    None
                }
                Some(ts)
                    if (ts - now).num_milliseconds()
                        > self.config.max_future_skew_secs.saturating_mul(1000) =>
                {
                    violations.push(Violation::structural(
                        "timestamp",
                        format!(
                            "is more than {} seconds in the future",
                            self.config.max_future_skew_secs
                        ),
                    ));
                    None
                }
                Some(ts) => Some(ts),
            },
        };

        let mut soft = Vec::new();
        let accuracy = check_optional(raw.accuracy, "accuracy", &mut soft, |v| {
            (0.0..=self.config.max_accuracy_m)
                .contains(&v)
                .then_some(())
                .ok_or_else(|| format!("must be within [0, {}] meters", self.config.max_accuracy_m))
        });
        let speed = check_optional(raw.speed, "speed", &mut soft, |v| {
            (v >= 0.0).then_some(()).ok_or_else(|| "must not be negative".to_string())
        });
        let heading = check_optional(raw.heading, "heading", &mut soft, |v| {
            (0.0..360.0)
                .contains(&v)
                .then_some(())
                .ok_or_else(|| "must be within [0, 360) degrees".to_string())
        });
        let altitude = check_optional(raw.altitude, "altitude", &mut soft, |_| Ok(()));
        let battery_level = check_optional(raw.battery_level, "batteryLevel", &mut soft, percent);
        let signal_strength =
            check_optional(raw.signal_strength, "signalStrength", &mut soft, percent);

        if self.config.strict_ranges {
            violations.append(&mut soft);
        }

        match (latitude, longitude, timestamp) {
            (Some(latitude), Some(longitude), Some(timestamp)) if violations.is_empty() => {
                let coordinate = Coordinate::from_checked(CheckedFields {
                    vehicle_id: vehicle_id.to_string(),
                    latitude: round_coordinate(latitude),
                    longitude: round_coordinate(longitude),
                    timestamp,
                    accuracy,
                    speed,
                    heading,
                    altitude,
                    battery_level,
                    signal_strength,
                });
                if !soft.is_empty() {
                    log::debug!(
                        "vehicle {}: accepted with {} range warning(s)",
                        vehicle_id,
                        soft.len()
                    );
                }
                Ok(Validated {
                    coordinate,
                    warnings: soft,
                })
            }
            _ => Err(ValidationErrors { violations }),
        }
    }

    /// Validate a batch, counting duplicates and out-of-sequence entries.
    ///
    /// Nothing is dropped for being a duplicate or out of order; those are
    /// reported through [`BatchWarnings`] only.
    pub fn validate_batch_at(&self, raws: &[RawCoordinate], now: DateTime<Utc>) -> BatchValidation {
        let mut out = BatchValidation::default();
        let mut seen: HashSet<(String, DateTime<Utc>)> = HashSet::new();
        let mut latest: HashMap<String, DateTime<Utc>> = HashMap::new();

        for (index, raw) in raws.iter().enumerate() {
            match self.validate_at(raw, now) {
                Ok(validated) => {
                    let c = validated.coordinate;
                    let key = (c.vehicle_id().to_string(), c.timestamp());
                    if !seen.insert(key) {
                        out.warnings.duplicates += 1;
                    }
                    match latest.get_mut(c.vehicle_id()) {
                        Some(last) if c.timestamp() < *last => {
                            out.warnings.out_of_sequence_count += 1;
                        }
                        Some(last) => *last = c.timestamp(),
                        None => {
                            latest.insert(c.vehicle_id().to_string(), c.timestamp());
                        }
                    }
                    out.validated.push(c);
                }
                Err(errors) => {
                    log::warn!("batch entry {} rejected: {}", index, errors);
                    out.rejected.push((index, errors));
                }
            }
        }

        log::debug!(
            "batch: {} accepted, {} rejected, {} duplicate(s), {} out of sequence",
            out.validated.len(),
            out.rejected.len(),
            out.warnings.duplicates,
            out.warnings.out_of_sequence_count
        );
        out
    }

    pub fn validate_batch(&self, raws: &[RawCoordinate]) -> BatchValidation {
        self.validate_batch_at(raws, Utc::now())
    }
}

/// Re-apply sanitization to an already validated coordinate.
///
/// Idempotent: sanitizing twice yields the same value as sanitizing once.
pub fn sanitize(c: &Coordinate) -> Coordinate {
    Coordinate::from_checked(CheckedFields {
        vehicle_id: c.vehicle_id().trim().to_string(),
        latitude: round_coordinate(c.latitude()),
        longitude: round_coordinate(c.longitude()),
        timestamp: truncate_to_millis(c.timestamp()).unwrap_or_else(|| c.timestamp()),
        accuracy: c.accuracy(),
        speed: c.speed(),
        heading: c.heading(),
        altitude: c.altitude(),
        battery_level: c.battery_level(),
        signal_strength: c.signal_strength(),
    })
}

fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_DECIMALS);
    (value * scale).round() / scale
}

fn truncate_to_millis(ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts.timestamp_millis())
}

fn parse_timestamp(raw: &RawTimestamp) -> Option<DateTime<Utc>> {
    let parsed = match raw {
        RawTimestamp::EpochMillis(ms) => DateTime::from_timestamp_millis(*ms),
        RawTimestamp::Text(text) => {
            let text = text.trim();
            DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                // Zone-less ISO strings are taken as UTC
                .or_else(|| {
                    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                        .ok()
                        .map(|naive| naive.and_utc())
                })
        }
    };
    parsed.and_then(truncate_to_millis)
}

fn check_required_range(
    value: Option<f64>,
    field: &'static str,
    min: f64,
    max: f64,
    violations: &mut Vec<Violation>,
) -> Option<f64> {
    match value {
        None => {
            violations.push(Violation::structural(field, "is required"));
            None
        }
        Some(v) if !v.is_finite() => {
            violations.push(Violation::structural(field, "must be a finite number"));
            None
        }
        Some(v) if v < min || v > max => {
            violations.push(Violation::structural(
                field,
                format!("{} is outside [{}, {}]", v, min, max),
            ));
            None
        }
        Some(v) => Some(v),
    }
}

/// Check an optional field; failing values are recorded and dropped, never clamped
fn check_optional(
    value: Option<f64>,
    field: &'static str,
    soft: &mut Vec<Violation>,
    rule: impl Fn(f64) -> Result<(), String>,
) -> Option<f64> {
    let v = value?;
    if !v.is_finite() {
        soft.push(Violation::range(field, "must be a finite number"));
        return None;
    }
    match rule(v) {
        Ok(()) => Some(v),
        Err(message) => {
            soft.push(Violation {
                field,
                class: ViolationClass::RangeWarning,
                message: format!("{} {}", v, message),
            });
            None
        }
    }
}

fn percent(v: f64) -> Result<(), String> {
    if (0.0..=100.0).contains(&v) {
        Ok(())
    } else {
        Err("must be within [0, 100] percent".to_string())
    }
}
