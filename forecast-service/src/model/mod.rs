use std::collections::HashMap;
use std::time::Instant;

use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_linear::{FittedLinearRegression, LinearRegression};
use meter_domain::{Interval, MeterReading};
use ndarray::{Array1, Array2};
use time::Date;

use crate::{
    config::ForecastConfig,
    error::ForecastError,
    features::{self, FeatureVector},
    partition,
};

/// Trained regressor pair for one interval: peak amount and peak timing.
struct RegressorPair {
    amount: FittedLinearRegression<f64>,
    timing: FittedLinearRegression<f64>,
}

/// Models and fallback statistics for one (meter, interval).
///
/// Timing is handled as the fractional offset into the interval, measured
/// from its start hour. Intervals may wrap midnight, where raw hour-of-day
/// is discontinuous (23.5 and 0.5 average to midday); offsets keep the
/// target contiguous, and outputs re-wrap to hour-of-day.
pub struct IntervalModel {
    pub interval: Interval,
    regressors: Option<RegressorPair>,
    pub training_rows: usize,
    /// Mean per-day peak consumption observed during training.
    pub mean_peak_kw: f64,
    /// Mean per-day peak offset into the interval, for the fallback path.
    mean_peak_offset: f64,
    /// Number of (day, interval) groups behind the statistics.
    pub observed_days: usize,
}

impl IntervalModel {
    pub fn is_trained(&self) -> bool {
        self.regressors.is_some()
    }

    /// Mean per-day fractional peak hour observed during training,
    /// re-wrapped into [0, 24).
    pub fn mean_peak_hour(&self) -> f64 {
        self.hour_from_offset(self.mean_peak_offset)
    }

    fn hour_from_offset(&self, offset: f64) -> f64 {
        (f64::from(self.interval.start_hour) + offset).rem_euclid(24.0)
    }

    /// Runs both regressors over one feature row, returning
    /// (peak amount, fractional peak hour). `None` when untrained.
    pub fn predict_row(&self, row: &[f64]) -> Option<(f64, f64)> {
        let pair = self.regressors.as_ref()?;
        let x = Array2::from_shape_vec((1, row.len()), row.to_vec()).ok()?;
        let amount = pair.amount.predict(&x)[0];
        let hour = self.hour_from_offset(pair.timing.predict(&x)[0]);
        Some((amount, hour))
    }
}

/// Aggregate outcome of fitting one meter's bank. Per-interval failures are
/// collected here instead of aborting the other intervals.
#[derive(Debug, Clone)]
pub struct FitReport {
    pub meter_id: String,
    pub intervals: usize,
    pub trained: usize,
    /// Intervals left untrained, with the reason.
    pub untrained: Vec<(String, String)>,
    pub training_rows: usize,
}

/// Immutable set of interval models for one meter.
///
/// A bank is built in full by `fit` and replaced wholesale on re-fit; it is
/// never updated in place.
pub struct ModelBank {
    pub meter_id: String,
    pub intervals: Vec<Interval>,
    models: Vec<IntervalModel>,
}

struct RowSet {
    x: Vec<f64>,
    y_amount: Vec<f64>,
    y_offset: Vec<f64>,
}

impl ModelBank {
    pub fn models(&self) -> &[IntervalModel] {
        &self.models
    }

    pub fn model(&self, interval_index: usize) -> Option<&IntervalModel> {
        self.models.get(interval_index)
    }

    /// Trains one amount and one timing regressor per interval.
    ///
    /// Targets are grouped per (calendar day, interval): the group's peak
    /// consumption and the fractional offset into the interval at which it
    /// occurred. Every in-group reading whose enabled lag features are all
    /// present contributes one training row carrying its group's targets;
    /// rows with missing lags are excluded, not imputed.
    pub fn fit(
        history: &[MeterReading],
        meter_id: &str,
        cfg: &ForecastConfig,
    ) -> Result<(Self, FitReport), ForecastError> {
        let started = Instant::now();
        let intervals = partition::partition(history, &cfg.partition)?;

        // Per-day peak targets within each interval: (peak kW, peak offset
        // from the interval's start hour).
        let mut groups: HashMap<(Date, usize), (f64, f64)> = HashMap::new();
        for r in history {
            let hour = r.hour_of_day();
            let Some(iv) = intervals.iter().find(|iv| iv.contains(hour)) else {
                continue;
            };
            let entry = groups
                .entry((r.ts.date(), iv.index))
                .or_insert((f64::NEG_INFINITY, 0.0));
            if r.kw > entry.0 {
                let offset = (r.fractional_hour() - f64::from(iv.start_hour)).rem_euclid(24.0);
                *entry = (r.kw, offset);
            }
        }

        if groups.is_empty() {
            return Err(ForecastError::InsufficientHistory(format!(
                "no per-day peaks derivable for meter {meter_id}"
            )));
        }

        let width = FeatureVector::model_width(&cfg.training);
        let mut row_sets: Vec<RowSet> = (0..intervals.len())
            .map(|_| RowSet {
                x: Vec::new(),
                y_amount: Vec::new(),
                y_offset: Vec::new(),
            })
            .collect();

        for r in history {
            let fv = features::build_features(r.ts, meter_id, history, &intervals)?;
            let Some(row) = fv.model_row(&cfg.training) else {
                continue;
            };
            let Some(&(peak_kw, peak_offset)) = groups.get(&(r.ts.date(), fv.interval_index))
            else {
                continue;
            };
            let set = &mut row_sets[fv.interval_index];
            set.x.extend_from_slice(&row);
            set.y_amount.push(peak_kw);
            set.y_offset.push(peak_offset);
        }

        let mut models = Vec::with_capacity(intervals.len());
        let mut report = FitReport {
            meter_id: meter_id.to_string(),
            intervals: intervals.len(),
            trained: 0,
            untrained: Vec::new(),
            training_rows: 0,
        };

        for iv in &intervals {
            let set = &row_sets[iv.index];
            let n = set.y_amount.len();
            report.training_rows += n;

            // Fallback statistics cover all observed days, trained or not.
            let day_peaks: Vec<(f64, f64)> = groups
                .iter()
                .filter(|((_, idx), _)| *idx == iv.index)
                .map(|(_, &p)| p)
                .collect();
            let observed_days = day_peaks.len();
            let (mean_peak_kw, mean_peak_offset) = if observed_days > 0 {
                (
                    day_peaks.iter().map(|p| p.0).sum::<f64>() / observed_days as f64,
                    day_peaks.iter().map(|p| p.1).sum::<f64>() / observed_days as f64,
                )
            } else {
                (0.0, 0.0)
            };

            let regressors = if n < cfg.training.min_training_rows {
                tracing::warn!(
                    interval = %iv.label,
                    rows = n,
                    min_rows = cfg.training.min_training_rows,
                    "not enough training rows, interval left untrained"
                );
                metrics::counter!("intervals_skipped_total").increment(1);
                report
                    .untrained
                    .push((iv.label.clone(), format!("{n} training rows")));
                None
            } else {
                match fit_pair(&set.x, &set.y_amount, &set.y_offset, width) {
                    Ok(pair) => {
                        report.trained += 1;
                        metrics::counter!("intervals_trained_total").increment(1);
                        Some(pair)
                    }
                    Err(e) => {
                        tracing::warn!(
                            interval = %iv.label,
                            error = %e,
                            "regressor fit failed, interval left untrained"
                        );
                        metrics::counter!("intervals_skipped_total").increment(1);
                        report.untrained.push((iv.label.clone(), e.to_string()));
                        None
                    }
                }
            };

            models.push(IntervalModel {
                interval: iv.clone(),
                regressors,
                training_rows: n,
                mean_peak_kw,
                mean_peak_offset,
                observed_days,
            });
        }

        metrics::histogram!("fit_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            meter_id,
            intervals = report.intervals,
            trained = report.trained,
            rows = report.training_rows,
            "model bank fitted"
        );

        Ok((
            Self {
                meter_id: meter_id.to_string(),
                intervals,
                models,
            },
            report,
        ))
    }
}

fn fit_pair(
    x: &[f64],
    y_amount: &[f64],
    y_offset: &[f64],
    width: usize,
) -> Result<RegressorPair, ForecastError> {
    let n = y_amount.len();
    let records = Array2::from_shape_vec((n, width), x.to_vec())
        .map_err(|e| ForecastError::Training(e.to_string()))?;

    let amount_ds = Dataset::new(records.clone(), Array1::from_vec(y_amount.to_vec()));
    let amount = LinearRegression::new()
        .fit(&amount_ds)
        .map_err(|e| ForecastError::Training(e.to_string()))?;

    let timing_ds = Dataset::new(records, Array1::from_vec(y_offset.to_vec()));
    let timing = LinearRegression::new()
        .fit(&timing_ds)
        .map_err(|e| ForecastError::Training(e.to_string()))?;

    Ok(RegressorPair { amount, timing })
}
