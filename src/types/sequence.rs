use std::collections::BTreeMap;

use serde::Serialize;

use super::Coordinate;
use crate::error::{Result, TelemetryError};

/// Time-ordered coordinates of a single vehicle.
///
/// Construction stable-sorts by timestamp. Out-of-order input is counted, not
/// rejected, so the anomaly detector can report it later.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateSequence {
    vehicle_id: String,
    coordinates: Vec<Coordinate>,
    out_of_order_count: usize,
    duplicate_timestamp_count: usize,
    #[serde(skip)]
    reordered_indices: Vec<usize>,
}

impl CoordinateSequence {
    pub fn new(coordinates: Vec<Coordinate>) -> Result<Self> {
        let first = coordinates.first().ok_or(TelemetryError::EmptySequence)?;
        let vehicle_id = first.vehicle_id().to_string();

        if let Some(other) = coordinates.iter().find(|c| c.vehicle_id() != vehicle_id) {
            return Err(TelemetryError::MixedVehicles {
                expected: vehicle_id,
                found: other.vehicle_id().to_string(),
            });
        }

        // Both sides of every inversion, by arrival position
        let mut inverted = vec![false; coordinates.len()];
        let mut out_of_order_count = 0;
        for i in 1..coordinates.len() {
            if coordinates[i].timestamp() < coordinates[i - 1].timestamp() {
                out_of_order_count += 1;
                inverted[i - 1] = true;
                inverted[i] = true;
            }
        }

        let mut coordinates = coordinates;
        let mut reordered_indices = Vec::new();
        if out_of_order_count > 0 {
            log::debug!(
                "vehicle {}: reordering {} out-of-order coordinate(s)",
                vehicle_id,
                out_of_order_count
            );
            let mut arrivals: Vec<(usize, Coordinate)> = coordinates.into_iter().enumerate().collect();
            arrivals.sort_by_key(|(_, c)| c.timestamp());
            reordered_indices = arrivals
                .iter()
                .enumerate()
                .filter(|(_, (arrival, _))| inverted[*arrival])
                .map(|(position, _)| position)
                .collect();
            coordinates = arrivals.into_iter().map(|(_, c)| c).collect();
        }

        let duplicate_timestamp_count = coordinates
            .windows(2)
            .filter(|w| w[1].timestamp() == w[0].timestamp())
            .count();

        Ok(Self {
            vehicle_id,
            coordinates,
            out_of_order_count,
            duplicate_timestamp_count,
            reordered_indices,
        })
    }

    /// Split a mixed-vehicle history into one sequence per vehicle, ordered by vehicle id
    pub fn group_by_vehicle(coordinates: &[Coordinate]) -> Vec<CoordinateSequence> {
        let mut groups: BTreeMap<&str, Vec<Coordinate>> = BTreeMap::new();
        for c in coordinates {
            groups.entry(c.vehicle_id()).or_default().push(c.clone());
        }
        groups
            .into_values()
            .filter_map(|group| CoordinateSequence::new(group).ok())
            .collect()
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Entries that arrived earlier than their predecessor
    pub fn out_of_order_count(&self) -> usize {
        self.out_of_order_count
    }

    /// Adjacent entries sharing the exact same timestamp
    pub fn duplicate_timestamp_count(&self) -> usize {
        self.duplicate_timestamp_count
    }

    /// Sorted positions of the fixes that took part in an arrival-order inversion
    pub fn reordered_indices(&self) -> &[usize] {
        &self.reordered_indices
    }

    /// Minutes between first and last coordinate
    pub fn elapsed_minutes(&self) -> f64 {
        match (self.coordinates.first(), self.coordinates.last()) {
            (Some(a), Some(b)) => (b.timestamp() - a.timestamp()).num_milliseconds() as f64 / 60_000.0,
            _ => 0.0,
        }
    }
}
