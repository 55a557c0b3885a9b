//! Geofence definitions, containment and compliance reporting.
//!
//! Creation-time geometry checks (self-intersection, minimum area) are the
//! approximate ones from [`crate::geometry`] and only produce warnings. Runtime
//! containment uses an exact point-in-polygon test and never consults them.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::GeofenceErrors;
use crate::geometry::{bounding_box, point_in_circle, polygon_area_m2, polygon_self_intersects, BoundingBox};
use crate::types::{Coordinate, CoordinateSequence, LatLon, Position};

pub const MIN_RADIUS_M: f64 = 10.0;
pub const MAX_RADIUS_M: f64 = 50_000.0;
pub const MIN_POLYGON_POINTS: usize = 3;
pub const MAX_POLYGON_POINTS: usize = 50;
/// Polygons smaller than this get a warning (m²)
pub const MIN_POLYGON_AREA_M2: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GeofenceKind {
    Circle,
    Polygon,
}

/// What counts as a violation when a vehicle enters the fence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationPolicy {
    /// Entry by a vehicle that is not assigned to the fence
    #[default]
    UnassignedEntry,
    /// Restricted zone: every entry
    AnyEntry,
    /// Events only, never violations
    MonitorOnly,
}

/// Geofence as submitted by the management collaborator, not yet checked
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceDraft {
    pub id: String,
    pub name: String,
    pub kind: GeofenceKind,
    #[serde(default)]
    pub center: Option<LatLon>,
    #[serde(default)]
    pub radius_meters: Option<f64>,
    #[serde(default)]
    pub polygon_points: Option<Vec<LatLon>>,
    #[serde(default)]
    pub assigned_vehicle_ids: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub violation_policy: ViolationPolicy,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "kind")]
pub enum GeofenceShape {
    Circle { center: LatLon, radius_meters: f64 },
    Polygon { points: Vec<LatLon> },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Geofence {
    id: String,
    name: String,
    shape: GeofenceShape,
    assigned_vehicle_ids: BTreeSet<String>,
    active: bool,
    violation_policy: ViolationPolicy,
    #[serde(skip)]
    region: Region,
}

/// Precomputed containment helper
#[derive(Debug, Clone)]
enum Region {
    Circle { bbox: BoundingBox },
    /// Longitudes unwrapped to within 180° of `reference_lon`, so rings
    /// crossing the antimeridian stay contiguous
    Polygon { polygon: Polygon<f64>, reference_lon: f64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidatedGeofence {
    pub geofence: Geofence,
    /// Advisory geometry warnings (self-intersection, tiny area)
    pub warnings: Vec<String>,
}

impl GeofenceDraft {
    pub fn circle(id: &str, name: &str, center: LatLon, radius_meters: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: GeofenceKind::Circle,
            center: Some(center),
            radius_meters: Some(radius_meters),
            polygon_points: None,
            assigned_vehicle_ids: Vec::new(),
            active: true,
            violation_policy: ViolationPolicy::default(),
        }
    }

    pub fn polygon(id: &str, name: &str, points: Vec<LatLon>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: GeofenceKind::Polygon,
            center: None,
            radius_meters: None,
            polygon_points: Some(points),
            assigned_vehicle_ids: Vec::new(),
            active: true,
            violation_policy: ViolationPolicy::default(),
        }
    }

    pub fn assign(mut self, vehicle_id: &str) -> Self {
        self.assigned_vehicle_ids.push(vehicle_id.to_string());
        self
    }

    pub fn with_policy(mut self, policy: ViolationPolicy) -> Self {
        self.violation_policy = policy;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Check geometry constraints and build the immutable fence.
    ///
    /// Constraint violations reject (never clamp) and are all reported at once.
    pub fn build(self) -> Result<ValidatedGeofence, GeofenceErrors> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if self.id.trim().is_empty() {
            errors.push("id must not be blank".to_string());
        }
        if self.name.trim().is_empty() {
            errors.push("name must not be blank".to_string());
        }

        let shape = match self.kind {
            GeofenceKind::Circle => {
                match self.center {
                    None => errors.push("circle requires a center".to_string()),
                    Some(c) if !c.is_in_range() => {
                        errors.push("circle center is outside lat/lon range".to_string())
                    }
                    Some(_) => {}
                }
                match self.radius_meters {
                    None => errors.push("circle requires radiusMeters".to_string()),
                    Some(r) if !(MIN_RADIUS_M..=MAX_RADIUS_M).contains(&r) => errors.push(format!(
                        "radiusMeters {} is outside [{}, {}]",
                        r, MIN_RADIUS_M, MAX_RADIUS_M
                    )),
                    Some(_) => {}
                }
                match (self.center, self.radius_meters) {
                    (Some(center), Some(radius_meters)) => {
                        Some(GeofenceShape::Circle { center, radius_meters })
                    }
                    _ => None,
                }
            }
            GeofenceKind::Polygon => match self.polygon_points {
                None => {
                    errors.push("polygon requires polygonPoints".to_string());
                    None
                }
                Some(mut points) => {
                    // An explicitly closed ring repeats its first vertex
                    if points.len() > MIN_POLYGON_POINTS && points.first() == points.last() {
                        points.pop();
                    }
                    if !(MIN_POLYGON_POINTS..=MAX_POLYGON_POINTS).contains(&points.len()) {
                        errors.push(format!(
                            "polygon has {} points, expected {} to {}",
                            points.len(),
                            MIN_POLYGON_POINTS,
                            MAX_POLYGON_POINTS
                        ));
                    }
                    let bad = points.iter().filter(|p| !p.is_in_range()).count();
                    if bad > 0 {
                        errors.push(format!("{} polygon point(s) outside lat/lon range", bad));
                    }
                    if errors.is_empty() {
                        if polygon_self_intersects(&points) {
                            warnings.push("polygon edges appear to self-intersect".to_string());
                        }
                        let area = polygon_area_m2(&points);
                        if area < MIN_POLYGON_AREA_M2 {
                            warnings.push(format!(
                                "polygon area {:.1} m² is below {} m²",
                                area, MIN_POLYGON_AREA_M2
                            ));
                        }
                    }
                    Some(GeofenceShape::Polygon { points })
                }
            },
        };

        let shape = match shape {
            Some(shape) if errors.is_empty() => shape,
            _ => return Err(GeofenceErrors { violations: errors }),
        };

        for warning in &warnings {
            log::warn!("geofence {}: {}", self.id, warning);
        }

        let region = match &shape {
            GeofenceShape::Circle { center, radius_meters } => Region::Circle {
                // Slightly padded so the pre-filter never rejects a boundary point
                bbox: bounding_box(center, radius_meters / 1000.0 * 1.01),
            },
            GeofenceShape::Polygon { points } => {
                let reference_lon = points.first().map(|p| p.longitude).unwrap_or(0.0);
                let ring: Vec<Coord<f64>> = points
                    .iter()
                    .map(|p| Coord {
                        x: unwrap_longitude(p.longitude, reference_lon),
                        y: p.latitude,
                    })
                    .collect();
                Region::Polygon {
                    polygon: Polygon::new(LineString::from(ring), vec![]),
                    reference_lon,
                }
            }
        };

        Ok(ValidatedGeofence {
            geofence: Geofence {
                id: self.id,
                name: self.name,
                shape,
                assigned_vehicle_ids: self.assigned_vehicle_ids.into_iter().collect(),
                active: self.active,
                violation_policy: self.violation_policy,
                region,
            },
            warnings,
        })
    }
}

impl Geofence {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &GeofenceShape {
        &self.shape
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn violation_policy(&self) -> ViolationPolicy {
        self.violation_policy
    }

    pub fn is_assigned(&self, vehicle_id: &str) -> bool {
        self.assigned_vehicle_ids.contains(vehicle_id)
    }

    /// Exact containment, boundary inclusive.
    ///
    /// Polygon edges are straight in lon/lat and may cross the antimeridian;
    /// a polygon may not span more than 180° of longitude.
    pub fn contains<P: Position + ?Sized>(&self, point: &P) -> bool {
        match (&self.shape, &self.region) {
            (GeofenceShape::Circle { center, radius_meters }, Region::Circle { bbox }) => {
                bbox.contains(point) && point_in_circle(point, center, *radius_meters)
            }
            (_, Region::Polygon { polygon, reference_lon }) => {
                let coord = Coord {
                    x: unwrap_longitude(point.longitude(), *reference_lon),
                    y: point.latitude(),
                };
                polygon.coordinate_position(&coord) != CoordPos::Outside
            }
            _ => false,
        }
    }

    /// Whether entry by `vehicle_id` is a violation under this fence's policy
    pub fn entry_violates(&self, vehicle_id: &str) -> bool {
        match self.violation_policy {
            ViolationPolicy::UnassignedEntry => !self.is_assigned(vehicle_id),
            ViolationPolicy::AnyEntry => true,
            ViolationPolicy::MonitorOnly => false,
        }
    }
}

/// `lon` shifted by whole turns to lie within 180° of `reference`
fn unwrap_longitude(lon: f64, reference: f64) -> f64 {
    reference + (lon - reference + 180.0).rem_euclid(360.0) - 180.0
}

/// Free-function form used by ingestion code
pub fn contains<P: Position + ?Sized>(point: &P, geofence: &Geofence) -> bool {
    geofence.contains(point)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GeofenceEventKind {
    Enter,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceEvent {
    pub geofence_id: String,
    pub vehicle_id: String,
    pub kind: GeofenceEventKind,
    pub timestamp: DateTime<Utc>,
    pub location: LatLon,
    pub violation: bool,
}

/// Live enter/exit detection.
///
/// Keeps one inside/outside flag per (vehicle, geofence). A vehicle with no
/// history is treated as outside, so its first fix inside a fence is an entry.
#[derive(Debug, Default)]
pub struct GeofenceTracker {
    inside: HashMap<(String, String), bool>,
}

impl GeofenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, coordinate: &Coordinate, geofences: &[Geofence]) -> Vec<GeofenceEvent> {
        let mut events = Vec::new();
        for fence in geofences.iter().filter(|g| g.is_active()) {
            let now_inside = fence.contains(coordinate);
            let key = (coordinate.vehicle_id().to_string(), fence.id().to_string());
            let was_inside = self.inside.insert(key, now_inside).unwrap_or(false);

            let kind = match (was_inside, now_inside) {
                (false, true) => GeofenceEventKind::Enter,
                (true, false) => GeofenceEventKind::Exit,
                _ => continue,
            };
            let violation =
                kind == GeofenceEventKind::Enter && fence.entry_violates(coordinate.vehicle_id());
            if violation {
                log::warn!(
                    "vehicle {} entered geofence {} in violation of {:?}",
                    coordinate.vehicle_id(),
                    fence.id(),
                    fence.violation_policy()
                );
            }
            events.push(GeofenceEvent {
                geofence_id: fence.id().to_string(),
                vehicle_id: coordinate.vehicle_id().to_string(),
                kind,
                timestamp: coordinate.timestamp(),
                location: coordinate.lat_lon(),
                violation,
            });
        }
        events
    }

    /// Whether the vehicle was last seen inside the fence
    pub fn is_inside(&self, vehicle_id: &str, geofence_id: &str) -> bool {
        self.inside
            .get(&(vehicle_id.to_string(), geofence_id.to_string()))
            .copied()
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VehicleActivity {
    pub entries: usize,
    pub exits: usize,
    pub violations: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub geofence_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub total_entries: usize,
    pub total_exits: usize,
    pub violations_count: usize,
    pub per_vehicle_activity: BTreeMap<String, VehicleActivity>,
    pub events: Vec<GeofenceEvent>,
}

/// Recompute compliance for one fence from stored history.
///
/// Only coordinates inside `[window_start, window_end]` count. Each vehicle is
/// replayed in timestamp order starting outside the fence.
pub fn evaluate(
    coordinates: &[Coordinate],
    geofence: &Geofence,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> ComplianceReport {
    let mut report = ComplianceReport {
        geofence_id: geofence.id().to_string(),
        window_start,
        window_end,
        total_entries: 0,
        total_exits: 0,
        violations_count: 0,
        per_vehicle_activity: BTreeMap::new(),
        events: Vec::new(),
    };

    if !geofence.is_active() {
        log::debug!("geofence {} is inactive; empty report", geofence.id());
        return report;
    }

    let in_window: Vec<Coordinate> = coordinates
        .iter()
        .filter(|c| c.timestamp() >= window_start && c.timestamp() <= window_end)
        .cloned()
        .collect();

    let fences = std::slice::from_ref(geofence);
    for sequence in CoordinateSequence::group_by_vehicle(&in_window) {
        let mut tracker = GeofenceTracker::new();
        let activity = report
            .per_vehicle_activity
            .entry(sequence.vehicle_id().to_string())
            .or_default();

        for c in sequence.coordinates() {
            for event in tracker.observe(c, fences) {
                match event.kind {
                    GeofenceEventKind::Enter => activity.entries += 1,
                    GeofenceEventKind::Exit => activity.exits += 1,
                }
                if event.violation {
                    activity.violations += 1;
                }
                report.events.push(event);
            }
        }
    }

    for activity in report.per_vehicle_activity.values() {
        report.total_entries += activity.entries;
        report.total_exits += activity.exits;
        report.violations_count += activity.violations;
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::EARTH_RADIUS_KM;
    use crate::test_support::{at, coord};

    fn meters_to_lat_degrees(m: f64) -> f64 {
        m / (EARTH_RADIUS_KM * 1000.0 * std::f64::consts::PI / 180.0)
    }

    fn depot() -> Geofence {
        GeofenceDraft::circle("depot", "Main depot", LatLon::new(4.60, -74.08), 100.0)
            .assign("truck-1")
            .build()
            .unwrap()
            .geofence
    }

    fn square(id: &str) -> GeofenceDraft {
        GeofenceDraft::polygon(
            id,
            "Square",
            vec![
                LatLon::new(0.0, 0.0),
                LatLon::new(0.0, 0.01),
                LatLon::new(0.01, 0.01),
                LatLon::new(0.01, 0.0),
            ],
        )
    }

    #[test]
    fn test_circle_containment_boundary() {
        let fence = depot();
        assert!(fence.contains(&LatLon::new(4.60, -74.08)));
        let outside = LatLon::new(4.60 + meters_to_lat_degrees(100.001), -74.08);
        assert!(!contains(&outside, &fence));
        let inside = LatLon::new(4.60 - meters_to_lat_degrees(99.9), -74.08);
        assert!(fence.contains(&inside));
    }

    #[test]
    fn test_circle_containment_matches_distance_near_pole() {
        let center = LatLon::new(89.5, 0.0);
        let fence = GeofenceDraft::circle("polar", "Polar", center, 50_000.0)
            .build()
            .unwrap()
            .geofence;
        let mut inside = 0;
        for lat_step in 0..=20 {
            let lat = 88.0 + lat_step as f64 * 0.1;
            for lon in -180..180 {
                let p = LatLon::new(lat, lon as f64);
                let expected = point_in_circle(&p, &center, 50_000.0);
                assert_eq!(fence.contains(&p), expected, "mismatch at ({lat}, {lon})");
                if expected {
                    inside += 1;
                }
            }
        }
        assert!(inside > 60);
    }

    #[test]
    fn test_radius_bounds_rejected() {
        for radius in [9.99, 50_000.5, f64::NAN] {
            let err = GeofenceDraft::circle("c", "C", LatLon::new(0.0, 0.0), radius)
                .build()
                .unwrap_err();
            assert!(err.violations[0].contains("radiusMeters"));
        }
        assert!(GeofenceDraft::circle("c", "C", LatLon::new(0.0, 0.0), 10.0).build().is_ok());
        assert!(GeofenceDraft::circle("c", "C", LatLon::new(0.0, 0.0), 50_000.0).build().is_ok());
    }

    #[test]
    fn test_all_geometry_errors_reported() {
        let err = GeofenceDraft::circle(" ", "", LatLon::new(95.0, 0.0), 5.0)
            .build()
            .unwrap_err();
        assert_eq!(err.violations.len(), 4);
    }

    #[test]
    fn test_polygon_point_count() {
        let two = GeofenceDraft::polygon("p", "P", vec![LatLon::new(0.0, 0.0), LatLon::new(0.0, 1.0)]);
        assert!(two.build().is_err());

        let many: Vec<LatLon> = (0..51)
            .map(|i| {
                let a = i as f64 / 51.0 * std::f64::consts::TAU;
                LatLon::new(a.sin() * 0.01, a.cos() * 0.01)
            })
            .collect();
        assert!(GeofenceDraft::polygon("p", "P", many.clone()).build().is_err());
        assert!(GeofenceDraft::polygon("p", "P", many[..50].to_vec()).build().is_ok());
    }

    #[test]
    fn test_closed_ring_accepted() {
        let mut draft = square("sq");
        if let Some(points) = draft.polygon_points.as_mut() {
            points.push(LatLon::new(0.0, 0.0));
        }
        let validated = draft.build().unwrap();
        match validated.geofence.shape() {
            GeofenceShape::Polygon { points } => assert_eq!(points.len(), 4),
            _ => panic!("expected polygon"),
        }
        assert!(validated.warnings.is_empty());
    }

    #[test]
    fn test_polygon_warnings_do_not_reject() {
        let bowtie = GeofenceDraft::polygon(
            "bt",
            "Bowtie",
            vec![
                LatLon::new(0.0, 0.0),
                LatLon::new(0.01, 0.01),
                LatLon::new(0.0, 0.01),
                LatLon::new(0.01, 0.0),
            ],
        );
        let validated = bowtie.build().unwrap();
        assert!(validated.warnings.iter().any(|w| w.contains("self-intersect")));

        let tiny = GeofenceDraft::polygon(
            "tiny",
            "Tiny",
            vec![
                LatLon::new(0.0, 0.0),
                LatLon::new(0.0, 0.00005),
                LatLon::new(0.00005, 0.0),
            ],
        );
        let validated = tiny.build().unwrap();
        assert!(validated.warnings.iter().any(|w| w.contains("area")));
    }

    #[test]
    fn test_polygon_containment_exact() {
        let fence = square("sq").build().unwrap().geofence;
        assert!(fence.contains(&LatLon::new(0.005, 0.005)));
        assert!(fence.contains(&LatLon::new(0.0, 0.005)));
        assert!(!fence.contains(&LatLon::new(0.011, 0.005)));

        // Concave "L": the notch is outside even though it is inside the bounding box
        let l_shape = GeofenceDraft::polygon(
            "l",
            "L",
            vec![
                LatLon::new(0.0, 0.0),
                LatLon::new(0.0, 0.02),
                LatLon::new(0.01, 0.02),
                LatLon::new(0.01, 0.01),
                LatLon::new(0.02, 0.01),
                LatLon::new(0.02, 0.0),
            ],
        )
        .build()
        .unwrap()
        .geofence;
        assert!(l_shape.contains(&LatLon::new(0.015, 0.005)));
        assert!(!l_shape.contains(&LatLon::new(0.015, 0.015)));
    }

    #[test]
    fn test_polygon_across_antimeridian() {
        let validated = GeofenceDraft::polygon(
            "dateline",
            "Dateline",
            vec![
                LatLon::new(-10.0, 179.0),
                LatLon::new(-10.0, -179.0),
                LatLon::new(10.0, -179.0),
                LatLon::new(10.0, 179.0),
            ],
        )
        .build()
        .unwrap();
        assert!(validated.warnings.is_empty(), "{:?}", validated.warnings);

        let fence = validated.geofence;
        assert!(fence.contains(&LatLon::new(0.0, 179.5)));
        assert!(fence.contains(&LatLon::new(0.0, -179.5)));
        assert!(fence.contains(&LatLon::new(0.0, 180.0)));
        assert!(!fence.contains(&LatLon::new(0.0, 0.0)));
        assert!(!fence.contains(&LatLon::new(0.0, 178.0)));
        assert!(!fence.contains(&LatLon::new(0.0, -178.0)));
    }

    #[test]
    fn test_tracker_enter_exit() {
        let fence = depot();
        let fences = vec![fence];
        let mut tracker = GeofenceTracker::new();

        let inside = coord("truck-9", 4.60, -74.08, at(0));
        let still_inside = coord("truck-9", 4.6001, -74.08, at(60));
        let outside = coord("truck-9", 4.61, -74.08, at(120));

        let events = tracker.observe(&inside, &fences);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, GeofenceEventKind::Enter);
        assert!(events[0].violation);
        assert!(tracker.is_inside("truck-9", "depot"));

        assert!(tracker.observe(&still_inside, &fences).is_empty());

        let events = tracker.observe(&outside, &fences);
        assert_eq!(events[0].kind, GeofenceEventKind::Exit);
        assert!(!events[0].violation);
    }

    #[test]
    fn test_evaluate_compliance_report() {
        let fence = depot();
        let history = vec![
            // assigned truck enters and leaves
            coord("truck-1", 4.61, -74.08, at(0)),
            coord("truck-1", 4.60, -74.08, at(60)),
            coord("truck-1", 4.61, -74.08, at(120)),
            // unassigned truck enters twice
            coord("truck-2", 4.60, -74.08, at(0)),
            coord("truck-2", 4.61, -74.08, at(60)),
            coord("truck-2", 4.60, -74.08, at(120)),
            // outside the window
            coord("truck-3", 4.60, -74.08, at(10_000)),
        ];
        let report = evaluate(&history, &fence, at(0), at(3600));
        assert_eq!(report.total_entries, 3);
        assert_eq!(report.total_exits, 2);
        assert_eq!(report.violations_count, 2);
        assert_eq!(
            report.per_vehicle_activity["truck-1"],
            VehicleActivity { entries: 1, exits: 1, violations: 0 }
        );
        assert_eq!(
            report.per_vehicle_activity["truck-2"],
            VehicleActivity { entries: 2, exits: 1, violations: 2 }
        );
        assert!(!report.per_vehicle_activity.contains_key("truck-3"));
        assert_eq!(report.events.len(), 5);
    }

    #[test]
    fn test_evaluate_policies() {
        let history = vec![
            coord("truck-1", 0.005, 0.005, at(0)),
            coord("truck-2", 0.005, 0.005, at(0)),
        ];
        let restricted = square("r")
            .assign("truck-1")
            .with_policy(ViolationPolicy::AnyEntry)
            .build()
            .unwrap()
            .geofence;
        assert_eq!(evaluate(&history, &restricted, at(0), at(60)).violations_count, 2);

        let monitor = square("m")
            .with_policy(ViolationPolicy::MonitorOnly)
            .build()
            .unwrap()
            .geofence;
        let report = evaluate(&history, &monitor, at(0), at(60));
        assert_eq!(report.total_entries, 2);
        assert_eq!(report.violations_count, 0);
    }

    #[test]
    fn test_inactive_geofence_reports_nothing() {
        let fence = square("off").inactive().build().unwrap().geofence;
        let history = vec![coord("truck-2", 0.005, 0.005, at(0))];
        let report = evaluate(&history, &fence, at(0), at(60));
        assert_eq!(report.total_entries, 0);
        assert!(report.per_vehicle_activity.is_empty());

        let mut tracker = GeofenceTracker::new();
        assert!(tracker.observe(&history[0], &[fence]).is_empty());
    }
}
