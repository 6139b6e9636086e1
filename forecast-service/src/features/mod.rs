use meter_domain::{Interval, MeterReading};
use time::{Duration, OffsetDateTime};

use crate::{config::TrainingConfig, error::ForecastError};

/// Engineered features for one (meter, timestamp).
///
/// Lag fields hold the consumption at the same hour-of-day N days prior and
/// are `None` when that aligned reading is absent. Missing is tracked
/// explicitly, never imputed as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub meter_id: String,
    pub ts: OffsetDateTime,
    pub interval_index: usize,
    pub lag_1d: Option<f64>,
    pub lag_2d: Option<f64>,
    pub lag_7d: Option<f64>,
    pub hour_of_day: u8,
    pub day_of_week: u8,
    pub temperature: Option<f64>,
}

impl FeatureVector {
    /// Model-input row in column order `[lag_1d, lag_2d, lag_7d?, temperature?]`.
    ///
    /// Returns `None` when any enabled column is missing; such rows are
    /// excluded from training and disqualify the model path at prediction
    /// time.
    pub fn model_row(&self, cfg: &TrainingConfig) -> Option<Vec<f64>> {
        let mut row = vec![self.lag_1d?, self.lag_2d?];
        if cfg.use_weekly_lag {
            row.push(self.lag_7d?);
        }
        if cfg.use_temperature {
            row.push(self.temperature?);
        }
        Some(row)
    }

    pub fn model_width(cfg: &TrainingConfig) -> usize {
        2 + usize::from(cfg.use_weekly_lag) + usize::from(cfg.use_temperature)
    }
}

fn reading_at(lookback: &[MeterReading], target: OffsetDateTime) -> Option<&MeterReading> {
    lookback
        .binary_search_by(|r| r.ts.cmp(&target))
        .ok()
        .map(|i| &lookback[i])
}

/// Builds the feature vector for `ts` against a chronologically sorted
/// lookback and a fixed interval partition.
///
/// Deterministic and side-effect-free: the same (timestamp, lookback)
/// always yields the same vector. Interval boundaries are fixed before any
/// feature is built, so there is no training-time leakage.
pub fn build_features(
    ts: OffsetDateTime,
    meter_id: &str,
    lookback: &[MeterReading],
    intervals: &[Interval],
) -> Result<FeatureVector, ForecastError> {
    let hour = ts.hour();
    let interval_index = intervals
        .iter()
        .find(|iv| iv.contains(hour))
        .map(|iv| iv.index)
        .ok_or_else(|| {
            ForecastError::MissingFeature(format!("no interval covers hour {hour:02}"))
        })?;

    Ok(FeatureVector {
        meter_id: meter_id.to_string(),
        ts,
        interval_index,
        lag_1d: reading_at(lookback, ts - Duration::hours(24)).map(|r| r.kw),
        lag_2d: reading_at(lookback, ts - Duration::hours(48)).map(|r| r.kw),
        lag_7d: reading_at(lookback, ts - Duration::hours(168)).map(|r| r.kw),
        hour_of_day: hour,
        day_of_week: ts.weekday().number_days_from_monday(),
        temperature: reading_at(lookback, ts).and_then(|r| r.temperature),
    })
}
