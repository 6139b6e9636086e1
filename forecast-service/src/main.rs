use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use forecast_service::{
    config::AppConfig,
    metrics_server, observability,
    predictor::PeakPredictor,
    sources::{readings_csv_file, segments},
};
use meter_domain::MeterReading;
use tokio::task::JoinSet;

// Readings more than this far apart start a new segment.
const MAX_GAP_HOURS: f64 = 1.5;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let path = cfg.readings_csv.clone();
    let readings =
        tokio::task::spawn_blocking(move || readings_csv_file::load_readings(Path::new(&path)))
            .await??;
    tracing::info!(rows = readings.len(), "readings loaded");

    let mut per_meter: HashMap<String, Vec<MeterReading>> = HashMap::new();
    for r in readings {
        per_meter.entry(r.meter_id.clone()).or_default().push(r);
    }

    // The engine is synchronous and single-threaded per meter; distinct
    // meters share no state, so each one fits and predicts on its own
    // blocking task.
    let mut tasks = JoinSet::new();
    for (meter_id, mut history) in per_meter {
        let cfg = cfg.clone();
        tasks.spawn_blocking(move || -> Result<()> {
            history.sort_by_key(|r| r.ts);

            let min_len = cfg.forecast.partition.min_history_hours;
            let Some(segment) =
                segments::longest_contiguous_segment(&history, MAX_GAP_HOURS, min_len)
            else {
                anyhow::bail!(
                    "meter {meter_id}: no contiguous segment of at least {min_len} readings"
                );
            };

            let mut predictor = PeakPredictor::new(cfg.forecast.clone());
            let report = predictor.fit(&meter_id, segment)?;
            tracing::info!(
                meter_id = %meter_id,
                intervals = report.intervals,
                trained = report.trained,
                untrained = report.untrained.len(),
                rows = report.training_rows,
                "fit complete"
            );
            for (label, reason) in &report.untrained {
                tracing::warn!(meter_id = %meter_id, interval = %label, reason = %reason, "interval untrained");
            }

            let (lookback, current) = segment.split_at(segment.len() - 1);
            let lookback = &lookback[lookback.len().saturating_sub(cfg.lookback_hours)..];
            let predictions = predictor.predict_peaks(&current[0], lookback)?;

            let json = serde_json::to_string(&predictions)?;
            tracing::info!(meter_id = %meter_id, predictions = %json, "peak forecast");
            Ok(())
        });
    }

    while let Some(res) = tasks.join_next().await {
        if let Err(e) = res? {
            tracing::error!(error = %e, "meter task failed");
        }
    }

    Ok(())
}
