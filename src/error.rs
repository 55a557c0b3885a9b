use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

/// How a violated rule is treated by the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationClass {
    /// Coordinate is unusable (bad lat/lon, missing id, unparsable or future timestamp)
    StructuralInvalid,
    /// Optional metadata outside its soft bounds
    RangeWarning,
}

/// A single violated validation rule
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{field}: {message}")]
pub struct Violation {
    pub field: &'static str,
    pub class: ViolationClass,
    pub message: String,
}

impl Violation {
    pub fn structural(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            class: ViolationClass::StructuralInvalid,
            message: message.into(),
        }
    }

    pub fn range(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            class: ViolationClass::RangeWarning,
            message: message.into(),
        }
    }
}

/// Every rule a coordinate failed, collected in one pass
#[derive(Error, Debug, Clone, PartialEq, Serialize, Default)]
#[error("{} rule(s) violated: {}", .violations.len(), join(.violations))]
pub struct ValidationErrors {
    pub violations: Vec<Violation>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// True if any violation refers to `field`
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    pub fn structural(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.class == ViolationClass::StructuralInvalid)
    }
}

/// Geofence definition rejected at creation/update time
#[derive(Error, Debug, Clone, PartialEq, Serialize, Default)]
#[error("invalid geofence geometry: {}", join(.violations))]
pub struct GeofenceErrors {
    pub violations: Vec<String>,
}

fn join<T: Display>(items: &[T]) -> String {
    items.iter().map(|item| item.to_string()).collect::<Vec<_>>().join("; ")
}

/// Engine error types
#[derive(Error, Debug, Clone)]
pub enum TelemetryError {
    #[error("Coordinate rejected: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Geofence rejected: {0}")]
    Geofence(#[from] GeofenceErrors),

    #[error("Coordinate sequence is empty")]
    EmptySequence,

    #[error("Sequence mixes vehicles: expected {expected}, found {found}")]
    MixedVehicles { expected: String, found: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_display_lists_all() {
        let errors = ValidationErrors {
            violations: vec![
                Violation::structural("latitude", "must be within [-90, 90]"),
                Violation::range("heading", "must be within [0, 360)"),
            ],
        };
        let text = errors.to_string();
        assert_eq!(
            text,
            "2 rule(s) violated: latitude: must be within [-90, 90]; heading: must be within [0, 360)"
        );
        assert!(text.contains("2 rule(s)"));
        assert!(text.contains("latitude"));
        assert!(text.contains("heading"));
        assert_eq!(errors.structural().count(), 1);
    }

    #[test]
    fn test_error_conversion() {
        let err: TelemetryError = ValidationErrors::default().into();
        assert!(matches!(err, TelemetryError::Validation(_)));
        let err: TelemetryError = GeofenceErrors {
            violations: vec!["radius".to_string()],
        }
        .into();
        assert!(err.to_string().contains("radius"));
    }

    #[test]
    fn test_geofence_errors_display_and_source() {
        let errors = GeofenceErrors {
            violations: vec!["radius too small".to_string(), "name is empty".to_string()],
        };
        assert_eq!(
            errors.to_string(),
            "invalid geofence geometry: radius too small; name is empty"
        );
        let err: Box<dyn std::error::Error> = Box::new(errors);
        assert!(err.source().is_none());
    }
}
