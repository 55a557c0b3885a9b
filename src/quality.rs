//! Per-fix data quality scoring.
//!
//! Quality only ever ratchets downward within one evaluation: every check
//! proposes a level and the worst one wins, whatever order the checks run in.

use serde::{Deserialize, Serialize};

use crate::anomaly::{PatternFinding, Severity};
use crate::geometry::speed_kmh;
use crate::types::{Coordinate, CoordinateSequence};

/// Ordered best to worst, so `max` is the downgrade reducer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QualityConfig {
    /// Accuracy radius above which a fix is at most Medium (meters)
    pub medium_accuracy_m: f64,
    /// Accuracy radius above which a fix is Low (meters)
    pub low_accuracy_m: f64,
    /// Implied speed from the previous fix above which the fix is Low (km/h)
    pub max_implied_speed_kmh: f64,
    /// Allowed gap between reported and implied speed (km/h)
    pub speed_mismatch_kmh: f64,
    pub low_battery_pct: f64,
    pub weak_signal_pct: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            medium_accuracy_m: 20.0,
            low_accuracy_m: 50.0,
            max_implied_speed_kmh: 200.0,
            speed_mismatch_kmh: 20.0,
            low_battery_pct: 20.0,
            weak_signal_pct: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityAssessment {
    pub quality: QualityLevel,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_speed_kmh: Option<f64>,
}

impl QualityAssessment {
    fn new() -> Self {
        Self {
            quality: QualityLevel::High,
            warnings: Vec::new(),
            errors: Vec::new(),
            calculated_speed_kmh: None,
        }
    }

    fn downgrade(&mut self, candidate: QualityLevel) {
        self.quality = self.quality.max(candidate);
    }
}

/// Quality of a whole sequence, anomaly findings folded in
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchQuality {
    pub assessments: Vec<QualityAssessment>,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    /// Worst level in the batch
    pub overall: QualityLevel,
}

/// Admits fixes at or above a minimum quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityGate {
    pub minimum: QualityLevel,
}

impl QualityGate {
    pub fn new(minimum: QualityLevel) -> Self {
        Self { minimum }
    }

    pub fn admits(&self, assessment: &QualityAssessment) -> bool {
        assessment.quality <= self.minimum
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(QualityLevel::Medium)
    }
}

#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    config: QualityConfig,
}

impl QualityScorer {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Score one fix, optionally against the vehicle's previous fix
    pub fn score(&self, coordinate: &Coordinate, previous: Option<&Coordinate>) -> QualityAssessment {
        let cfg = &self.config;
        let mut a = QualityAssessment::new();

        if let Some(accuracy) = coordinate.accuracy() {
            if accuracy > cfg.low_accuracy_m {
                a.warnings.push(format!("Poor GPS accuracy: {:.1} m", accuracy));
                a.downgrade(QualityLevel::Low);
            } else if accuracy > cfg.medium_accuracy_m {
                a.warnings.push(format!("Moderate GPS accuracy: {:.1} m", accuracy));
                a.downgrade(QualityLevel::Medium);
            }
        }

        let previous = match previous {
            Some(prev) if coordinate.timestamp() <= prev.timestamp() => {
                a.warnings
                    .push("Timestamp is not after the previous fix; implied speed unavailable".to_string());
                None
            }
            other => other,
        };

        if let Some(prev) = previous {
            let implied = speed_kmh(prev, coordinate);
            a.calculated_speed_kmh = Some(implied);

            if implied > cfg.max_implied_speed_kmh {
                a.errors
                    .push(format!("Unrealistic speed: {:.1} km/h since previous fix", implied));
                a.downgrade(QualityLevel::Low);
            }
            if let Some(reported) = coordinate.speed() {
                let gap = (reported - implied).abs();
                if gap > cfg.speed_mismatch_kmh {
                    a.warnings.push(format!(
                        "Reported speed {:.1} km/h differs from calculated {:.1} km/h",
                        reported, implied
                    ));
                    a.downgrade(QualityLevel::Medium);
                }
            }
        }

        if let Some(battery) = coordinate.battery_level() {
            if battery < cfg.low_battery_pct {
                a.warnings.push(format!("Low device battery: {:.0}%", battery));
            }
        }

        if let Some(signal) = coordinate.signal_strength() {
            if signal < cfg.weak_signal_pct {
                a.warnings.push(format!("Weak signal: {:.0}%", signal));
                a.downgrade(QualityLevel::Medium);
            }
        }

        a
    }

    /// Score every fix in order and fold anomaly findings into the fixes they name.
    ///
    /// High-severity findings force Low, Medium ones cap at Medium, Low ones
    /// only add a warning. Findings are matched by `involved_indices`, so they
    /// must come from this same sequence; out-of-range indices are ignored.
    pub fn score_sequence(
        &self,
        sequence: &CoordinateSequence,
        findings: &[PatternFinding],
    ) -> BatchQuality {
        let coords = sequence.coordinates();
        let mut assessments: Vec<QualityAssessment> = coords
            .iter()
            .enumerate()
            .map(|(i, c)| self.score(c, i.checked_sub(1).map(|p| &coords[p])))
            .collect();

        for finding in findings {
            let level = match finding.severity {
                Severity::High => Some(QualityLevel::Low),
                Severity::Medium => Some(QualityLevel::Medium),
                Severity::Low => None,
            };
            for &i in finding.involved_indices.iter() {
                let Some(a) = assessments.get_mut(i) else { continue };
                a.warnings.push(format!("{:?} anomaly: {}", finding.pattern, finding.description));
                if let Some(level) = level {
                    a.downgrade(level);
                }
            }
        }

        let count = |level: QualityLevel| assessments.iter().filter(|a| a.quality == level).count();
        BatchQuality {
            high_count: count(QualityLevel::High),
            medium_count: count(QualityLevel::Medium),
            low_count: count(QualityLevel::Low),
            overall: assessments
                .iter()
                .map(|a| a.quality)
                .max()
                .unwrap_or(QualityLevel::High),
            assessments,
        }
    }
}
