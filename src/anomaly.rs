//! Data-quality anomaly detection over a single vehicle's sequence.
//!
//! Findings are advisory. Nothing here drops or edits a coordinate; callers
//! decide enforcement through [`AnomalyPolicy`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize, Serializer};

use crate::geometry::{distance_km, speed_kmh};
use crate::types::{Coordinate, CoordinateSequence, Position};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnomalyConfig {
    /// Interval speed above which ground movement is impossible (km/h)
    pub teleport_speed_kmh: f64,
    /// A stuck run must contain more than this many coordinates
    pub stuck_run_threshold: usize,
    /// Lat/lon tolerance for "same position" (degrees)
    pub stuck_tolerance_deg: f64,
    /// Number of leading coordinates inspected for drift
    pub drift_window: usize,
    /// Drift needs more than this many jitter-sized steps in the window
    pub drift_pair_threshold: usize,
    /// Jitter step lower bound, exclusive (meters)
    pub drift_min_step_m: f64,
    /// Jitter step upper bound, exclusive (meters)
    pub drift_max_step_m: f64,
    /// Window start-to-end displacement must stay below this for drift (meters)
    pub drift_max_net_displacement_m: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            teleport_speed_kmh: 300.0,
            stuck_run_threshold: 10,
            stuck_tolerance_deg: 1e-6,
            drift_window: 20,
            drift_pair_threshold: 10,
            drift_min_step_m: 5.0,
            drift_max_step_m: 50.0,
            drift_max_net_displacement_m: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatternType {
    Teleportation,
    Stuck,
    Drift,
    Replay,
}

/// Ordered so that `max` picks the most serious
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternFinding {
    #[serde(rename = "type")]
    pub pattern: PatternType,
    pub severity: Severity,
    pub description: String,
    pub involved_coordinates: Vec<Coordinate>,
    /// Positions of `involved_coordinates` in the timestamp-ordered sequence
    pub involved_indices: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    ReviewHardware,
    MonitorDevice,
    Normal,
}

impl Recommendation {
    pub fn from_findings(findings: &[PatternFinding]) -> Self {
        match findings.iter().map(|f| f.severity).max() {
            Some(Severity::High) => Recommendation::ReviewHardware,
            Some(_) => Recommendation::MonitorDevice,
            None => Recommendation::Normal,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Recommendation::ReviewHardware => {
                "Critical GPS anomalies detected: review device hardware and data collection"
            }
            Recommendation::MonitorDevice => {
                "Minor GPS anomalies detected: monitor device for recurring issues"
            }
            Recommendation::Normal => "GPS data appears normal",
        }
    }
}

impl Serialize for Recommendation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyReport {
    pub vehicle_id: String,
    pub findings: Vec<PatternFinding>,
    pub recommendation: Recommendation,
}

impl AnomalyReport {
    pub fn highest_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }
}

/// Caller-side enforcement of anomaly findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnomalyPolicy {
    #[default]
    AdvisoryOnly,
    RejectOnHigh,
    RejectOnAny,
}

impl AnomalyPolicy {
    /// Whether the report should block ingestion of the sequence
    pub fn blocks(&self, report: &AnomalyReport) -> bool {
        match (self, report.highest_severity()) {
            (AnomalyPolicy::AdvisoryOnly, _) | (_, None) => false,
            (AnomalyPolicy::RejectOnHigh, Some(severity)) => severity == Severity::High,
            (AnomalyPolicy::RejectOnAny, Some(_)) => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    /// Run every check; read-only and deterministic
    pub fn detect(&self, sequence: &CoordinateSequence) -> AnomalyReport {
        let coords = sequence.coordinates();
        let mut findings = Vec::new();

        self.detect_teleportation(coords, &mut findings);
        self.detect_stuck(coords, &mut findings);
        self.detect_drift(coords, &mut findings);
        detect_replay(sequence, &mut findings);

        let recommendation = Recommendation::from_findings(&findings);
        if !findings.is_empty() {
            log::debug!(
                "vehicle {}: {} finding(s), recommendation: {}",
                sequence.vehicle_id(),
                findings.len(),
                recommendation.message()
            );
        }

        AnomalyReport {
            vehicle_id: sequence.vehicle_id().to_string(),
            findings,
            recommendation,
        }
    }

    fn detect_teleportation(&self, coords: &[Coordinate], findings: &mut Vec<PatternFinding>) {
        for (i, pair) in coords.windows(2).enumerate() {
            let speed = speed_kmh(&pair[0], &pair[1]);
            if speed > self.config.teleport_speed_kmh {
                findings.push(PatternFinding {
                    pattern: PatternType::Teleportation,
                    severity: Severity::High,
                    description: format!(
                        "Impossible jump of {:.2} km between {} and {} ({:.0} km/h)",
                        distance_km(&pair[0], &pair[1]),
                        pair[0].timestamp().to_rfc3339(),
                        pair[1].timestamp().to_rfc3339(),
                        speed
                    ),
                    involved_coordinates: pair.to_vec(),
                    involved_indices: vec![i, i + 1],
                });
            }
        }
    }

    fn detect_stuck(&self, coords: &[Coordinate], findings: &mut Vec<PatternFinding>) {
        let tol = self.config.stuck_tolerance_deg;
        let mut start = 0;
        while start < coords.len() {
            let anchor = &coords[start];
            let mut end = start + 1;
            while end < coords.len()
                && (coords[end].latitude() - anchor.latitude()).abs() <= tol
                && (coords[end].longitude() - anchor.longitude()).abs() <= tol
            {
                end += 1;
            }

            let run = &coords[start..end];
            if run.len() > self.config.stuck_run_threshold {
                let minutes = (run[run.len() - 1].timestamp() - run[0].timestamp())
                    .num_milliseconds() as f64
                    / 60_000.0;
                findings.push(PatternFinding {
                    pattern: PatternType::Stuck,
                    severity: Severity::Medium,
                    description: format!(
                        "{} consecutive fixes at ({:.6}, {:.6}) over {:.1} minutes",
                        run.len(),
                        anchor.latitude(),
                        anchor.longitude(),
                        minutes
                    ),
                    involved_coordinates: run.to_vec(),
                    involved_indices: (start..end).collect(),
                });
            }
            start = end;
        }
    }

    // Only the leading window is scanned; a sliding window over the whole
    // sequence would change which sequences are flagged.
    fn detect_drift(&self, coords: &[Coordinate], findings: &mut Vec<PatternFinding>) {
        let window = &coords[..coords.len().min(self.config.drift_window)];
        if window.len() < 2 {
            return;
        }

        let jitter_steps = window
            .windows(2)
            .map(|pair| distance_km(&pair[0], &pair[1]) * 1000.0)
            .filter(|&m| m > self.config.drift_min_step_m && m < self.config.drift_max_step_m)
            .count();
        let net_m = distance_km(&window[0], &window[window.len() - 1]) * 1000.0;

        if jitter_steps > self.config.drift_pair_threshold
            && net_m < self.config.drift_max_net_displacement_m
        {
            findings.push(PatternFinding {
                pattern: PatternType::Drift,
                severity: Severity::Low,
                description: format!(
                    "{} small position jumps in the first {} fixes with {:.1} m net movement",
                    jitter_steps,
                    window.len(),
                    net_m
                ),
                involved_coordinates: window.to_vec(),
                involved_indices: (0..window.len()).collect(),
            });
        }
    }
}

fn detect_replay(sequence: &CoordinateSequence, findings: &mut Vec<PatternFinding>) {
    let out_of_order = sequence.out_of_order_count();
    let duplicates = sequence.duplicate_timestamp_count();
    if out_of_order == 0 && duplicates == 0 {
        return;
    }

    let coords = sequence.coordinates();
    let mut involved: BTreeSet<usize> = sequence.reordered_indices().iter().copied().collect();
    for i in 1..coords.len() {
        if coords[i].timestamp() == coords[i - 1].timestamp() {
            involved.insert(i - 1);
            involved.insert(i);
        }
    }
    let involved_indices: Vec<usize> = involved.into_iter().collect();

    findings.push(PatternFinding {
        pattern: PatternType::Replay,
        severity: Severity::Medium,
        description: format!(
            "{} out-of-order and {} repeated-timestamp fix(es); data may have been replayed",
            out_of_order, duplicates
        ),
        involved_coordinates: involved_indices.iter().map(|&i| coords[i].clone()).collect(),
        involved_indices,
    });
}
