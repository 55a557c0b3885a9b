//! Engine-wide configuration.
//!
//! Every section falls back to its defaults when missing, so a JSON file only
//! needs to name the thresholds it changes:
//!
//! ```json
//! { "segmenter": { "minStopMinutes": 10.0 }, "anomalyPolicy": "rejectOnHigh" }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::anomaly::{AnomalyConfig, AnomalyPolicy};
use crate::error::{Result, TelemetryError};
use crate::quality::{QualityConfig, QualityGate, QualityLevel};
use crate::segmentation::SegmenterConfig;
use crate::validation::ValidatorConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub validator: ValidatorConfig,
    pub segmenter: SegmenterConfig,
    pub anomaly: AnomalyConfig,
    pub quality: QualityConfig,
    pub anomaly_policy: AnomalyPolicy,
    /// Worst quality still admitted by ingestion
    pub minimum_quality: QualityLevel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validator: ValidatorConfig::default(),
            segmenter: SegmenterConfig::default(),
            anomaly: AnomalyConfig::default(),
            quality: QualityConfig::default(),
            anomaly_policy: AnomalyPolicy::default(),
            minimum_quality: QualityLevel::Medium,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TelemetryError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| TelemetryError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn quality_gate(&self) -> QualityGate {
        QualityGate::new(self.minimum_quality)
    }

    /// Reject threshold combinations the engine cannot work with
    fn check(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.quality.medium_accuracy_m > self.quality.low_accuracy_m {
            problems.push("quality.mediumAccuracyM exceeds quality.lowAccuracyM");
        }
        if self.segmenter.stationary_speed_threshold_kmh < 0.0 {
            problems.push("segmenter.stationarySpeedThresholdKmh is negative");
        }
        if self.anomaly.drift_min_step_m > self.anomaly.drift_max_step_m {
            problems.push("anomaly.driftMinStepM exceeds anomaly.driftMaxStepM");
        }
        if self.validator.max_future_skew_secs < 0 {
            problems.push("validator.maxFutureSkewSecs is negative");
        }
        if self.anomaly.drift_window < 2 {
            problems.push("anomaly.driftWindow must cover at least two fixes");
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(TelemetryError::Config(problems.join("; ")))
        }
    }
}
