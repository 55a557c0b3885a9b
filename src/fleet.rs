//! Fleet-wide analysis of a mixed coordinate history.
//!
//! The history is split per vehicle and each vehicle's sequence runs through
//! the segmenter, the anomaly detector and batch quality scoring. Vehicles are
//! independent, so they are spread over scoped worker threads.

use std::thread;

use serde::Serialize;

use crate::anomaly::{AnomalyDetector, AnomalyReport};
use crate::config::EngineConfig;
use crate::error::{Result, TelemetryError};
use crate::quality::{BatchQuality, QualityGate, QualityScorer};
use crate::segmentation::{MovementSegmenter, SegmentationResult};
use crate::types::{Coordinate, CoordinateSequence};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleReport {
    pub vehicle_id: String,
    pub coordinate_count: usize,
    pub out_of_order_count: usize,
    pub duplicate_timestamp_count: usize,
    pub movement: SegmentationResult,
    pub anomalies: AnomalyReport,
    pub quality: BatchQuality,
    /// Fixes at or above the configured minimum quality
    pub admitted_count: usize,
    /// Anomaly policy blocks this vehicle's batch
    pub blocked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetTotals {
    pub vehicles: usize,
    pub coordinates: usize,
    pub distance_km: f64,
    pub moving_minutes: f64,
    pub idle_minutes: f64,
    pub stops: usize,
    pub findings: usize,
    pub admitted_coordinates: usize,
    pub blocked_vehicles: usize,
    pub max_speed_kmh: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetReport {
    /// Sorted by vehicle id
    pub vehicles: Vec<VehicleReport>,
    pub totals: FleetTotals,
}

impl FleetReport {
    pub fn vehicle(&self, vehicle_id: &str) -> Option<&VehicleReport> {
        self.vehicles.iter().find(|v| v.vehicle_id == vehicle_id)
    }
}

/// Engine components shared read-only by the workers
struct Analyzer {
    segmenter: MovementSegmenter,
    detector: AnomalyDetector,
    scorer: QualityScorer,
    gate: QualityGate,
    config: EngineConfig,
}

impl Analyzer {
    fn new(config: &EngineConfig) -> Self {
        Self {
            segmenter: MovementSegmenter::new(config.segmenter.clone()),
            detector: AnomalyDetector::new(config.anomaly.clone()),
            scorer: QualityScorer::new(config.quality.clone()),
            gate: config.quality_gate(),
            config: config.clone(),
        }
    }

    fn analyze(&self, sequence: &CoordinateSequence) -> VehicleReport {
        let movement = self.segmenter.segment(sequence);
        let anomalies = self.detector.detect(sequence);
        let quality = self.scorer.score_sequence(sequence, &anomalies.findings);
        let admitted_count = quality
            .assessments
            .iter()
            .filter(|a| self.gate.admits(a))
            .count();
        let blocked = self.config.anomaly_policy.blocks(&anomalies);
        if blocked {
            log::warn!(
                "vehicle {} blocked by anomaly policy: {}",
                sequence.vehicle_id(),
                anomalies.recommendation.message()
            );
        }
        VehicleReport {
            vehicle_id: sequence.vehicle_id().to_string(),
            coordinate_count: sequence.len(),
            out_of_order_count: sequence.out_of_order_count(),
            duplicate_timestamp_count: sequence.duplicate_timestamp_count(),
            movement,
            anomalies,
            quality,
            admitted_count,
            blocked,
        }
    }
}

/// Analyze every vehicle in `coordinates` in parallel
pub fn analyze_fleet(coordinates: &[Coordinate], config: &EngineConfig) -> Result<FleetReport> {
    let sequences = CoordinateSequence::group_by_vehicle(coordinates);
    if sequences.is_empty() {
        return Ok(FleetReport::default());
    }

    let analyzer = Analyzer::new(config);
    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(sequences.len());
    let chunk_size = sequences.len().div_ceil(workers);

    let chunks: Vec<Vec<VehicleReport>> = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = sequences
            .chunks(chunk_size)
            .map(|chunk| {
                let analyzer = &analyzer;
                scope.spawn(move |_| {
                    chunk
                        .iter()
                        .map(|s| analyzer.analyze(s))
                        .collect::<Vec<VehicleReport>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join())
            .collect::<std::result::Result<Vec<_>, _>>()
    })
    .and_then(|joined| joined)
    .map_err(|_| TelemetryError::Internal("fleet worker panicked".to_string()))?;

    // Chunks preserve the grouping order, which is sorted by vehicle id
    let vehicles: Vec<VehicleReport> = chunks.into_iter().flatten().collect();
    let totals = fleet_totals(&vehicles);

    log::debug!(
        "fleet: {} vehicle(s), {} coordinate(s), {:.3} km on {} worker(s)",
        totals.vehicles,
        totals.coordinates,
        totals.distance_km,
        workers
    );
    Ok(FleetReport { vehicles, totals })
}

fn fleet_totals(vehicles: &[VehicleReport]) -> FleetTotals {
    let mut totals = FleetTotals {
        vehicles: vehicles.len(),
        ..Default::default()
    };
    for v in vehicles {
        let m = &v.movement.totals;
        totals.coordinates += v.coordinate_count;
        totals.distance_km += m.distance_km;
        totals.moving_minutes += m.moving_minutes;
        totals.idle_minutes += m.idle_minutes;
        totals.max_speed_kmh = totals.max_speed_kmh.max(m.max_speed_kmh);
        totals.stops += v.movement.stops.len();
        totals.findings += v.anomalies.findings.len();
        totals.admitted_coordinates += v.admitted_count;
        if v.blocked {
            totals.blocked_vehicles += 1;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::AnomalyPolicy;
    use crate::quality::QualityLevel;
    use crate::test_support::{at, coord, validated};
    use crate::types::RawCoordinate;
    use approx::assert_relative_eq;

    /// Interleaved history: "car" drives north, "van" jumps, "bike" sits still
    fn history() -> Vec<Coordinate> {
        let mut coords = Vec::new();
        for i in 0..6 {
            coords.push(coord("car", 4.60 + i as f64 * 0.005, -74.08, at(i * 60)));
            coords.push(coord("bike", 4.65, -74.05, at(i * 60)));
        }
        coords.push(coord("van", 4.60, -74.10, at(0)));
        coords.push(coord("van", 4.70, -74.10, at(10)));
        coords
    }

    #[test]
    fn test_empty_history() {
        let report = analyze_fleet(&[], &EngineConfig::default()).unwrap();
        assert!(report.vehicles.is_empty());
        assert_eq!(report.totals, FleetTotals::default());
    }

    #[test]
    fn test_per_vehicle_reports_sorted() {
        let report = analyze_fleet(&history(), &EngineConfig::default()).unwrap();
        let ids: Vec<_> = report.vehicles.iter().map(|v| v.vehicle_id.as_str()).collect();
        assert_eq!(ids, vec!["bike", "car", "van"]);
        assert_eq!(report.totals.vehicles, 3);
        assert_eq!(report.totals.coordinates, 14);
    }

    #[test]
    fn test_totals_sum_vehicles() {
        let report = analyze_fleet(&history(), &EngineConfig::default()).unwrap();
        let sum: f64 = report.vehicles.iter().map(|v| v.movement.totals.distance_km).sum();
        assert_relative_eq!(report.totals.distance_km, sum, epsilon = 1e-12);
        assert!(report.vehicle("bike").unwrap().movement.totals.distance_km < 1e-9);
        // bike idles 5 minutes exactly: not a stop
        assert_eq!(report.totals.stops, 0);
    }

    #[test]
    fn test_van_flagged_and_blocked_under_policy() {
        let advisory = analyze_fleet(&history(), &EngineConfig::default()).unwrap();
        let van = advisory.vehicle("van").unwrap();
        assert_eq!(van.anomalies.findings.len(), 1);
        assert_eq!(van.quality.overall, QualityLevel::Low);
        assert!(!van.blocked);

        let config = EngineConfig {
            anomaly_policy: AnomalyPolicy::RejectOnHigh,
            ..Default::default()
        };
        let strict = analyze_fleet(&history(), &config).unwrap();
        assert!(strict.vehicle("van").unwrap().blocked);
        assert!(!strict.vehicle("car").unwrap().blocked);
        assert_eq!(strict.totals.blocked_vehicles, 1);
    }

    #[test]
    fn test_minimum_quality_gates_admission() {
        let mut coords = history();
        // Moderate accuracy puts every "taxi" fix at Medium
        coords.extend((0..4).map(|i| {
            validated(RawCoordinate::new("taxi", 4.62, -74.06, at(i * 60)).with_accuracy(30.0))
        }));

        let default = analyze_fleet(&coords, &EngineConfig::default()).unwrap();
        assert_eq!(default.vehicle("taxi").unwrap().admitted_count, 4);
        // The van's teleport pair is Low and never admitted
        assert_eq!(default.vehicle("van").unwrap().admitted_count, 0);
        assert_eq!(default.totals.admitted_coordinates, 16);

        let strict = EngineConfig {
            minimum_quality: QualityLevel::High,
            ..Default::default()
        };
        let report = analyze_fleet(&coords, &strict).unwrap();
        assert_eq!(report.vehicle("taxi").unwrap().admitted_count, 0);
        assert_eq!(report.vehicle("car").unwrap().admitted_count, 6);
        assert_eq!(report.totals.admitted_coordinates, 12);

        let open = EngineConfig {
            minimum_quality: QualityLevel::Low,
            ..Default::default()
        };
        let report = analyze_fleet(&coords, &open).unwrap();
        assert_eq!(report.totals.admitted_coordinates, report.totals.coordinates);
    }

    #[test]
    fn test_many_vehicles_match_sequential() {
        let mut coords = Vec::new();
        for v in 0..40 {
            for i in 0..5 {
                coords.push(coord(
                    &format!("v{v:02}"),
                    4.0 + v as f64 * 0.1 + i as f64 * 0.001,
                    -74.0,
                    at(i * 30),
                ));
            }
        }
        let report = analyze_fleet(&coords, &EngineConfig::default()).unwrap();
        assert_eq!(report.vehicles.len(), 40);

        let analyzer = Analyzer::new(&EngineConfig::default());
        for (seq, parallel) in CoordinateSequence::group_by_vehicle(&coords)
            .iter()
            .zip(&report.vehicles)
        {
            let sequential = analyzer.analyze(seq);
            assert_eq!(sequential.vehicle_id, parallel.vehicle_id);
            assert_eq!(sequential.movement.totals, parallel.movement.totals);
        }
    }
}
