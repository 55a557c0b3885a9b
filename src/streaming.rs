//! Streaming ingestion with per-vehicle continuity.
//!
//! The last accepted fix of each vehicle lives in one of a fixed number of
//! lock shards picked by hashing the vehicle id, so unrelated vehicles rarely
//! contend. The store is owned by the caller; there is no global instance.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, TelemetryError, Violation};
use crate::quality::{QualityAssessment, QualityScorer};
use crate::types::{Coordinate, RawCoordinate};
use crate::validation::CoordinateValidator;

pub const DEFAULT_SHARDS: usize = 16;

/// Result of ingesting one raw report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub coordinate: Coordinate,
    pub assessment: QualityAssessment,
    /// Range issues tolerated by a lenient validator
    pub validation_warnings: Vec<Violation>,
    /// Older than the vehicle's last accepted fix; the stored fix was kept
    pub out_of_sequence: bool,
}

pub struct StreamingValidator {
    validator: CoordinateValidator,
    scorer: QualityScorer,
    shards: Vec<Mutex<HashMap<String, Coordinate>>>,
}

impl StreamingValidator {
    pub fn new(validator: CoordinateValidator, scorer: QualityScorer) -> Self {
        Self::with_shards(validator, scorer, DEFAULT_SHARDS)
    }

    pub fn with_shards(validator: CoordinateValidator, scorer: QualityScorer, shards: usize) -> Self {
        let shards = (0..shards.max(1)).map(|_| Mutex::new(HashMap::new())).collect();
        Self {
            validator,
            scorer,
            shards,
        }
    }

    pub fn ingest(&self, raw: &RawCoordinate) -> Result<IngestOutcome> {
        self.ingest_at(raw, Utc::now())
    }

    /// Validate, score against the vehicle's last fix and advance the store.
    ///
    /// A fix older than the stored one is scored on its own and does not
    /// replace it.
    pub fn ingest_at(&self, raw: &RawCoordinate, now: DateTime<Utc>) -> Result<IngestOutcome> {
        let validated = self.validator.validate_at(raw, now).map_err(|errors| {
            log::warn!("streaming: coordinate rejected: {}", errors);
            TelemetryError::from(errors)
        })?;
        let coordinate = validated.coordinate;

        let mut shard = self.shard(coordinate.vehicle_id())?;
        let previous = shard.get(coordinate.vehicle_id());
        let out_of_sequence = previous
            .map(|p| coordinate.timestamp() < p.timestamp())
            .unwrap_or(false);

        let mut assessment = if out_of_sequence {
            self.scorer.score(&coordinate, None)
        } else {
            self.scorer.score(&coordinate, previous)
        };

        if out_of_sequence {
            assessment
                .warnings
                .push("Out of sequence: older than the last accepted fix".to_string());
            log::debug!(
                "streaming: vehicle {} sent an out-of-sequence fix at {}",
                coordinate.vehicle_id(),
                coordinate.timestamp()
            );
        } else {
            shard.insert(coordinate.vehicle_id().to_string(), coordinate.clone());
        }

        Ok(IngestOutcome {
            coordinate,
            assessment,
            validation_warnings: validated.warnings,
            out_of_sequence,
        })
    }

    pub fn last_coordinate(&self, vehicle_id: &str) -> Result<Option<Coordinate>> {
        Ok(self.shard(vehicle_id)?.get(vehicle_id).cloned())
    }

    /// Drop a vehicle's continuity state; its next fix is scored without history
    pub fn forget(&self, vehicle_id: &str) -> Result<Option<Coordinate>> {
        Ok(self.shard(vehicle_id)?.remove(vehicle_id))
    }

    pub fn tracked_vehicles(&self) -> Result<usize> {
        let mut total = 0;
        for shard in &self.shards {
            total += lock(shard)?.len();
        }
        Ok(total)
    }

    pub fn reset(&self) -> Result<()> {
        for shard in &self.shards {
            lock(shard)?.clear();
        }
        Ok(())
    }

    fn shard(&self, vehicle_id: &str) -> Result<MutexGuard<'_, HashMap<String, Coordinate>>> {
        let mut hasher = DefaultHasher::new();
        vehicle_id.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        lock(&self.shards[index])
    }
}

impl Default for StreamingValidator {
    fn default() -> Self {
        Self::new(CoordinateValidator::default(), QualityScorer::default())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| {
        log::warn!("streaming: shard lock poisoned");
        TelemetryError::Internal("Failed to acquire vehicle state lock".to_string())
    })
}
