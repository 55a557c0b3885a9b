use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use fleet_telemetry_rs::{
    analyze_fleet, geofence, AnomalyPolicy, CoordinateValidator, EngineConfig, GeofenceDraft,
    RawCoordinate,
};

#[derive(Parser, Debug)]
#[command(about = "Replay a telemetry log through validation, analytics and geofence compliance")]
struct Args {
    /// Path to a telemetry log (.json or .json.gz) of the form {"coordinates": [...]}
    #[arg(long)]
    log: PathBuf,

    /// JSON array of geofence definitions
    #[arg(long)]
    geofences: Option<PathBuf>,

    /// Engine configuration JSON (missing fields use defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compliance window start (RFC 3339); defaults to the earliest accepted fix
    #[arg(long)]
    window_start: Option<DateTime<Utc>>,

    /// Compliance window end (RFC 3339); defaults to the latest accepted fix
    #[arg(long)]
    window_end: Option<DateTime<Utc>>,

    /// Block vehicles whose anomaly findings reach this severity (overrides config)
    #[arg(long, value_enum)]
    reject_on: Option<RejectOn>,

    /// Write the report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RejectOn {
    High,
    Any,
    None,
}

impl From<RejectOn> for AnomalyPolicy {
    fn from(value: RejectOn) -> Self {
        match value {
            RejectOn::High => AnomalyPolicy::RejectOnHigh,
            RejectOn::Any => AnomalyPolicy::RejectOnAny,
            RejectOn::None => AnomalyPolicy::AdvisoryOnly,
        }
    }
}

#[derive(Deserialize)]
struct LogFile {
    coordinates: Vec<RawCoordinate>,
}

fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let gz = GzDecoder::new(file);
        let reader = BufReader::new(gz);
        Ok(serde_json::from_reader(reader)?)
    } else {
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match args.config.as_ref() {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(reject_on) = args.reject_on {
        config.anomaly_policy = reject_on.into();
    }

    let log: LogFile = load_json(&args.log)
        .with_context(|| format!("failed to read log {}", args.log.display()))?;
    log::info!("{}: {} raw coordinate(s)", args.log.display(), log.coordinates.len());

    let batch = CoordinateValidator::new(config.validator.clone()).validate_batch(&log.coordinates);
    log::info!(
        "validated {} coordinate(s), rejected {}",
        batch.validated.len(),
        batch.rejected.len()
    );

    let fleet = analyze_fleet(&batch.validated, &config).context("fleet analysis failed")?;
    log::info!(
        "{} of {} coordinate(s) meet minimum quality {:?}",
        fleet.totals.admitted_coordinates,
        fleet.totals.coordinates,
        config.minimum_quality
    );
    if fleet.totals.blocked_vehicles > 0 {
        log::warn!(
            "{} vehicle(s) blocked by anomaly policy {:?}",
            fleet.totals.blocked_vehicles,
            config.anomaly_policy
        );
    }

    let mut compliance = Vec::new();
    let mut invalid_geofences = Vec::new();
    if let Some(path) = args.geofences.as_ref() {
        let drafts: Vec<GeofenceDraft> = load_json(path)
            .with_context(|| format!("failed to read geofences {}", path.display()))?;

        let first = batch.validated.iter().map(|c| c.timestamp()).min();
        let last = batch.validated.iter().map(|c| c.timestamp()).max();
        let window_start = args.window_start.or(first).unwrap_or_else(Utc::now);
        let window_end = args.window_end.or(last).unwrap_or(window_start);
        if window_end < window_start {
            anyhow::bail!("--window-end {} is before --window-start {}", window_end, window_start);
        }

        for draft in drafts {
            let id = draft.id.clone();
            match draft.build() {
                Ok(built) => {
                    let report = geofence::evaluate(
                        &batch.validated,
                        &built.geofence,
                        window_start,
                        window_end,
                    );
                    compliance.push(json!({ "report": report, "warnings": built.warnings }));
                }
                Err(errors) => {
                    log::warn!("geofence {} rejected: {}", id, errors);
                    invalid_geofences.push(json!({ "id": id, "errors": errors.violations }));
                }
            }
        }
    }

    let report = json!({
        "log": args.log.display().to_string(),
        "validation": {
            "accepted": batch.validated.len(),
            "rejected": batch.rejected.iter()
                .map(|(index, errors)| json!({ "index": index, "violations": errors.violations }))
                .collect::<Vec<_>>(),
            "warnings": batch.warnings,
        },
        "fleet": fleet,
        "geofences": compliance,
        "invalidGeofences": invalid_geofences,
    });

    let text = serde_json::to_string_pretty(&report)?;
    match args.output.as_ref() {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("report written to {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}
