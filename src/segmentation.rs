//! Movement segmentation: moving/idle classification, stops and trip totals.
//!
//! Each consecutive pair of fixes is one interval. Intervals slower than the
//! stationary threshold are idle. Idle runs long enough become stops; shorter
//! pauses are folded into the neighbouring moving segment and only show up in its
//! `idle_minutes`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::{distance_km, speed_kmh};
use crate::types::{Coordinate, CoordinateSequence};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SegmenterConfig {
    /// Intervals slower than this are idle (km/h)
    pub stationary_speed_threshold_kmh: f64,
    /// An idle run must last strictly longer than this to become a stop (minutes)
    pub min_stop_minutes: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            stationary_speed_threshold_kmh: 2.0,
            min_stop_minutes: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SegmentKind {
    Moving,
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementSegment {
    pub kind: SegmentKind,
    /// Index of the first coordinate in the sequence
    pub start_index: usize,
    /// Index of the last coordinate in the sequence (inclusive)
    pub end_index: usize,
    pub duration_minutes: f64,
    pub distance_km: f64,
    /// Short pauses folded into this segment
    pub idle_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub location: Coordinate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementTotals {
    pub distance_km: f64,
    pub moving_minutes: f64,
    pub idle_minutes: f64,
    /// Mean of per-interval speeds, not distance over time
    pub average_speed_kmh: f64,
    pub max_speed_kmh: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationResult {
    pub segments: Vec<MovementSegment>,
    pub stops: Vec<Stop>,
    pub totals: MovementTotals,
}

/// One consecutive pair of fixes
#[derive(Debug, Clone, Copy)]
struct Interval {
    kind: SegmentKind,
    minutes: f64,
    km: f64,
    speed_kmh: f64,
}

/// Maximal run of same-kind intervals, spanning coordinates `start..=end`
#[derive(Debug, Clone, Copy)]
struct Run {
    kind: SegmentKind,
    start: usize,
    end: usize,
    minutes: f64,
    km: f64,
}

#[derive(Debug, Clone, Default)]
pub struct MovementSegmenter {
    config: SegmenterConfig,
}

impl MovementSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn segment(&self, sequence: &CoordinateSequence) -> SegmentationResult {
        let coords = sequence.coordinates();
        if coords.len() < 2 {
            return SegmentationResult::default();
        }

        let intervals = self.classify(coords);
        let runs = group_runs(&intervals);

        let mut result = SegmentationResult {
            totals: totals(&intervals),
            ..Default::default()
        };

        // Leading short idle run waiting for the first moving segment
        let mut pending: Option<Run> = None;

        for run in runs {
            match run.kind {
                SegmentKind::Moving => {
                    // Continues a moving segment that absorbed the pause before this run
                    if let Some(prev) = result
                        .segments
                        .last_mut()
                        .filter(|s| s.kind == SegmentKind::Moving && s.end_index == run.start)
                    {
                        prev.end_index = run.end;
                        prev.duration_minutes += run.minutes;
                        prev.distance_km += run.km;
                        continue;
                    }
                    let mut segment = MovementSegment {
                        kind: SegmentKind::Moving,
                        start_index: run.start,
                        end_index: run.end,
                        duration_minutes: run.minutes,
                        distance_km: run.km,
                        idle_minutes: 0.0,
                    };
                    if let Some(pause) = pending.take() {
                        segment.start_index = pause.start;
                        segment.duration_minutes += pause.minutes;
                        segment.distance_km += pause.km;
                        segment.idle_minutes += pause.minutes;
                    }
                    result.segments.push(segment);
                }
                SegmentKind::Idle if run.minutes > self.config.min_stop_minutes => {
                    result.stops.push(Stop {
                        location: coords[run.start].clone(),
                        start_time: coords[run.start].timestamp(),
                        end_time: coords[run.end].timestamp(),
                        duration_minutes: run.minutes,
                    });
                    result.segments.push(MovementSegment {
                        kind: SegmentKind::Idle,
                        start_index: run.start,
                        end_index: run.end,
                        duration_minutes: run.minutes,
                        distance_km: run.km,
                        idle_minutes: run.minutes,
                    });
                }
                SegmentKind::Idle => match result.segments.last_mut() {
                    // Runs alternate, so a short pause after anything follows a moving segment
                    Some(prev) if prev.kind == SegmentKind::Moving => {
                        prev.end_index = run.end;
                        prev.duration_minutes += run.minutes;
                        prev.distance_km += run.km;
                        prev.idle_minutes += run.minutes;
                    }
                    _ => pending = Some(run),
                },
            }
        }

        // Never moved at all: keep the pause as its own idle segment, without a stop
        if let Some(pause) = pending {
            result.segments.push(MovementSegment {
                kind: SegmentKind::Idle,
                start_index: pause.start,
                end_index: pause.end,
                duration_minutes: pause.minutes,
                distance_km: pause.km,
                idle_minutes: pause.minutes,
            });
        }

        log::debug!(
            "vehicle {}: {} segment(s), {} stop(s), {:.3} km",
            sequence.vehicle_id(),
            result.segments.len(),
            result.stops.len(),
            result.totals.distance_km
        );
        result
    }

    fn classify(&self, coords: &[Coordinate]) -> Vec<Interval> {
        coords
            .windows(2)
            .map(|pair| {
                let (a, b) = (&pair[0], &pair[1]);
                let speed = speed_kmh(a, b);
                let kind = if speed < self.config.stationary_speed_threshold_kmh {
                    SegmentKind::Idle
                } else {
                    SegmentKind::Moving
                };
                Interval {
                    kind,
                    minutes: (b.timestamp() - a.timestamp()).num_milliseconds().max(0) as f64
                        / 60_000.0,
                    km: distance_km(a, b),
                    speed_kmh: speed,
                }
            })
            .collect()
    }
}

fn group_runs(intervals: &[Interval]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (i, interval) in intervals.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if run.kind == interval.kind => {
                run.end = i + 1;
                run.minutes += interval.minutes;
                run.km += interval.km;
            }
            _ => runs.push(Run {
                kind: interval.kind,
                start: i,
                end: i + 1,
                minutes: interval.minutes,
                km: interval.km,
            }),
        }
    }
    runs
}

fn totals(intervals: &[Interval]) -> MovementTotals {
    let mut totals = MovementTotals::default();
    for interval in intervals {
        totals.distance_km += interval.km;
        match interval.kind {
            SegmentKind::Moving => totals.moving_minutes += interval.minutes,
            SegmentKind::Idle => totals.idle_minutes += interval.minutes,
        }
        totals.max_speed_kmh = totals.max_speed_kmh.max(interval.speed_kmh);
    }
    if !intervals.is_empty() {
        totals.average_speed_kmh =
            intervals.iter().map(|i| i.speed_kmh).sum::<f64>() / intervals.len() as f64;
    }
    totals
}
