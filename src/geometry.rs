//! Great-circle geometry shared by every component.
//!
//! Distance, speed and bearing all go through [`haversine_km`] so the segmenter,
//! anomaly detector, quality scorer and geofence evaluator agree on every number.

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, Coord, Line, LineString, Polygon};
use serde::Serialize;

use crate::types::{Coordinate, Position};

/// Mean Earth radius (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_KM * c
}

/// Great-circle distance in kilometers
pub fn distance_km<A: Position + ?Sized, B: Position + ?Sized>(a: &A, b: &B) -> f64 {
    haversine_km(a.latitude(), a.longitude(), b.latitude(), b.longitude())
}

/// Hours from `a` to `b`; negative when `b` is older
pub fn elapsed_hours(a: &Coordinate, b: &Coordinate) -> f64 {
    (b.timestamp() - a.timestamp()).num_milliseconds() as f64 / 3_600_000.0
}

/// Implied speed between two fixes in km/h.
///
/// Returns 0 when the elapsed time is zero or negative instead of dividing by it.
pub fn speed_kmh(a: &Coordinate, b: &Coordinate) -> f64 {
    let hours = elapsed_hours(a, b);
    if hours <= 0.0 {
        return 0.0;
    }
    distance_km(a, b) / hours
}

/// Initial compass bearing from `a` to `b`, in [0, 360). Identical points give 0.
pub fn bearing_degrees<A: Position + ?Sized, B: Position + ?Sized>(a: &A, b: &B) -> f64 {
    let phi1 = a.latitude().to_radians();
    let phi2 = b.latitude().to_radians();
    let d_lon = (b.longitude() - a.longitude()).to_radians();

    let y = d_lon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lon.cos();
    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// True iff `p` lies within `radius_m` meters of `center` (boundary inclusive)
pub fn point_in_circle<A: Position + ?Sized, B: Position + ?Sized>(
    p: &A,
    center: &B,
    radius_m: f64,
) -> bool {
    distance_km(p, center) * 1000.0 <= radius_m
}

/// Lat/lon box around a point, for cheap pre-filtering before exact distance checks
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Handles boxes that straddle the antimeridian (`west > east`)
    pub fn contains<P: Position + ?Sized>(&self, p: &P) -> bool {
        let lat = p.latitude();
        let lon = p.longitude();
        if lat < self.south || lat > self.north {
            return false;
        }
        if self.west <= self.east {
            lon >= self.west && lon <= self.east
        } else {
            lon >= self.west || lon <= self.east
        }
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Box enclosing every point within `radius_km` of `center`.
///
/// The longitude half-width is the exact extent of the spherical cap,
/// `asin(sin(r / R) / cos(latitude))`. When the cap reaches a pole the box widens
/// to the full longitude range.
pub fn bounding_box<P: Position + ?Sized>(center: &P, radius_km: f64) -> BoundingBox {
    let angular = radius_km / EARTH_RADIUS_KM;
    let lat_delta = angular.to_degrees();
    let north = (center.latitude() + lat_delta).min(90.0);
    let south = (center.latitude() - lat_delta).max(-90.0);

    let ratio = angular.sin() / center.latitude().to_radians().cos();
    let lon_delta = if ratio.is_finite() && (0.0..1.0).contains(&ratio) {
        ratio.asin().to_degrees()
    } else {
        f64::INFINITY
    };

    if lon_delta >= 180.0 || north >= 90.0 || south <= -90.0 {
        return BoundingBox {
            north,
            south,
            east: 180.0,
            west: -180.0,
        };
    }

    BoundingBox {
        north,
        south,
        east: wrap_longitude(center.longitude() + lon_delta),
        west: wrap_longitude(center.longitude() - lon_delta),
    }
}

/// Equirectangular projection to local meters around `origin` (x east, y north)
fn project_local<P: Position + ?Sized>(p: &P, origin_lat: f64, origin_lon: f64) -> Coord<f64> {
    const R: f64 = EARTH_RADIUS_KM * 1000.0;
    let d_lat = (p.latitude() - origin_lat).to_radians();
    let d_lon = wrap_longitude(p.longitude() - origin_lon).to_radians();
    Coord {
        x: R * d_lon * origin_lat.to_radians().cos(),
        y: R * d_lat,
    }
}

fn project_ring<P: Position>(points: &[P]) -> Vec<Coord<f64>> {
    let n = points.len() as f64;
    let origin_lat = points.iter().map(|p| p.latitude()).sum::<f64>() / n;
    // Mean of wrapped offsets from the first vertex, so a ring across the
    // antimeridian centers on it instead of on the prime meridian
    let first_lon = points.first().map(|p| p.longitude()).unwrap_or(0.0);
    let mean_offset = points
        .iter()
        .map(|p| wrap_longitude(p.longitude() - first_lon))
        .sum::<f64>()
        / n;
    let origin_lon = wrap_longitude(first_lon + mean_offset);
    points
        .iter()
        .map(|p| project_local(p, origin_lat, origin_lon))
        .collect()
}

/// Approximate polygon area in square meters.
///
/// Shoelace formula over a local equirectangular projection. Good enough for
/// geofence sanity checks; not a geodesic area.
pub fn polygon_area_m2<P: Position>(points: &[P]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let ring = LineString::from(project_ring(points));
    Polygon::new(ring, vec![]).unsigned_area()
}

/// Approximate self-intersection test for a closed ring.
///
/// Works on the same planar projection as [`polygon_area_m2`], so edges that cross
/// only on the sphere (very large polygons) may be missed.
pub fn polygon_self_intersects<P: Position>(points: &[P]) -> bool {
    let n = points.len();
    if n < 4 {
        return false;
    }
    let ring = project_ring(points);
    let edges: Vec<Line<f64>> = (0..n).map(|i| Line::new(ring[i], ring[(i + 1) % n])).collect();

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(edges[i], edges[j]) {
                None => {}
                // Neighbours always share a vertex; only an overlap counts for them.
                Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                Some(_) => return true,
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, coord};
    use crate::types::LatLon;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_symmetry() {
        let pairs = [
            (LatLon::new(4.60, -74.08), LatLon::new(6.25, -75.56)),
            (LatLon::new(-33.86, 151.21), LatLon::new(51.50, -0.12)),
            (LatLon::new(0.0, 179.9), LatLon::new(0.0, -179.9)),
        ];
        for (a, b) in pairs {
            assert_relative_eq!(distance_km(&a, &b), distance_km(&b, &a), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zero_distance_identity() {
        let a = LatLon::new(4.60, -74.08);
        assert_eq!(distance_km(&a, &a), 0.0);
        let bearing = bearing_degrees(&a, &a);
        assert!(bearing.is_finite());
        assert!((0.0..360.0).contains(&bearing));
    }

    #[test]
    fn test_known_distance() {
        // 0.1 degree of latitude ≈ 11.12 km on a 6371 km sphere
        let a = LatLon::new(4.60, -74.08);
        let b = LatLon::new(4.70, -74.08);
        assert_relative_eq!(distance_km(&a, &b), 11.1195, epsilon = 1e-3);
    }

    #[test]
    fn test_speed_guards_non_increasing_time() {
        let a = coord("v", 4.60, -74.08, at(0));
        let b = coord("v", 4.70, -74.08, at(0));
        let c = coord("v", 4.70, -74.08, at(-10));
        assert_eq!(speed_kmh(&a, &b), 0.0);
        assert_eq!(speed_kmh(&a, &c), 0.0);

        let d = coord("v", 4.70, -74.08, at(3600));
        assert_relative_eq!(speed_kmh(&a, &d), 11.1195, epsilon = 1e-3);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = LatLon::new(0.0, 0.0);
        assert_relative_eq!(bearing_degrees(&origin, &LatLon::new(1.0, 0.0)), 0.0, epsilon = 1e-9);
        assert_relative_eq!(bearing_degrees(&origin, &LatLon::new(0.0, 1.0)), 90.0, epsilon = 1e-9);
        assert_relative_eq!(bearing_degrees(&origin, &LatLon::new(-1.0, 0.0)), 180.0, epsilon = 1e-9);
        assert_relative_eq!(bearing_degrees(&origin, &LatLon::new(0.0, -1.0)), 270.0, epsilon = 1e-9);
    }

    #[test]
    fn test_point_in_circle_boundary() {
        let center = LatLon::new(4.60, -74.08);
        assert!(point_in_circle(&center, &center, 100.0));

        // Step north until just past 100 m
        let meters_per_degree = EARTH_RADIUS_KM * 1000.0 * std::f64::consts::PI / 180.0;
        let outside = LatLon::new(4.60 + 100.001 / meters_per_degree, -74.08);
        assert!(distance_km(&outside, &center) * 1000.0 > 100.0);
        assert!(!point_in_circle(&outside, &center, 100.0));

        let inside = LatLon::new(4.60 + 99.99 / meters_per_degree, -74.08);
        assert!(point_in_circle(&inside, &center, 100.0));
    }

    #[test]
    fn test_bounding_box_latitude_correction() {
        let equator = bounding_box(&LatLon::new(0.0, 10.0), 10.0);
        let north = bounding_box(&LatLon::new(60.0, 10.0), 10.0);
        let eq_width = equator.east - equator.west;
        let north_width = north.east - north.west;
        // cos(60°) = 0.5, so the box is about twice as wide in degrees
        assert_relative_eq!(north_width, eq_width * 2.0, max_relative = 1e-5);
        assert_relative_eq!(north.north - north.south, equator.north - equator.south, epsilon = 1e-9);
        assert!(north.contains(&LatLon::new(60.05, 10.1)));
        assert!(!north.contains(&LatLon::new(60.5, 10.0)));
    }

    #[test]
    fn test_bounding_box_covers_cap_near_pole() {
        let center = LatLon::new(89.5, 0.0);
        let bbox = bounding_box(&center, 50.0);
        let mut lat = 88.0;
        while lat <= 90.0 {
            for lon in -180..180 {
                let p = LatLon::new(lat, lon as f64);
                if point_in_circle(&p, &center, 50_000.0) {
                    assert!(bbox.contains(&p), "({lat}, {lon}) inside circle but outside box");
                }
            }
            lat += 0.1;
        }
    }

    #[test]
    fn test_bounding_box_cap_extent_at_high_latitude() {
        // Exact cap half-width, slightly wider than lat_delta / cos(lat)
        let center = LatLon::new(80.0, 20.0);
        let bbox = bounding_box(&center, 50.0);
        let half_width = bbox.east - 20.0;
        let expected = ((50.0 / EARTH_RADIUS_KM).sin() / 80f64.to_radians().cos())
            .asin()
            .to_degrees();
        assert_relative_eq!(half_width, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_bounding_box_antimeridian() {
        let bbox = bounding_box(&LatLon::new(0.0, 179.99), 5.0);
        assert!(bbox.west > bbox.east);
        assert!(bbox.contains(&LatLon::new(0.0, -179.99)));
        assert!(bbox.contains(&LatLon::new(0.0, 179.95)));
        assert!(!bbox.contains(&LatLon::new(0.0, 170.0)));
    }

    #[test]
    fn test_polygon_area_square() {
        // ~111 m x ~111 m square near the equator
        let d = 0.001;
        let square = [
            LatLon::new(0.0, 0.0),
            LatLon::new(0.0, d),
            LatLon::new(d, d),
            LatLon::new(d, 0.0),
        ];
        let side = EARTH_RADIUS_KM * 1000.0 * d.to_radians();
        assert_relative_eq!(polygon_area_m2(&square), side * side, max_relative = 1e-3);
        assert!(!polygon_self_intersects(&square));
    }

    #[test]
    fn test_polygon_area_across_antimeridian() {
        let d = 0.001;
        let straddling = [
            LatLon::new(0.0, 180.0 - d / 2.0),
            LatLon::new(0.0, -180.0 + d / 2.0),
            LatLon::new(d, -180.0 + d / 2.0),
            LatLon::new(d, 180.0 - d / 2.0),
        ];
        let side = EARTH_RADIUS_KM * 1000.0 * d.to_radians();
        assert_relative_eq!(polygon_area_m2(&straddling), side * side, max_relative = 1e-3);
        assert!(!polygon_self_intersects(&straddling));
    }

    #[test]
    fn test_polygon_bowtie_self_intersects() {
        let bowtie = [
            LatLon::new(0.0, 0.0),
            LatLon::new(0.01, 0.01),
            LatLon::new(0.0, 0.01),
            LatLon::new(0.01, 0.0),
        ];
        assert!(polygon_self_intersects(&bowtie));
    }

    #[test]
    fn test_triangle_never_self_intersects() {
        let tri = [
            LatLon::new(0.0, 0.0),
            LatLon::new(0.0, 0.01),
            LatLon::new(0.01, 0.0),
        ];
        assert!(!polygon_self_intersects(&tri));
        assert!(polygon_area_m2(&tri) > 0.0);
    }
}
