use std::collections::{BTreeMap, HashMap};

use meter_domain::{MeterReading, PeakPrediction, PredictionSource};

use crate::{
    config::ForecastConfig,
    error::ForecastError,
    features,
    model::{FitReport, ModelBank},
};

/// Fit state of one meter's bank. `fit` is synchronous and installs a fully
/// built bank on success, so the transient fitting phase is unobservable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitState {
    Unfitted,
    Fitted,
}

/// Per-meter peak forecaster.
///
/// Owns one immutable `ModelBank` per fitted meter, keyed by meter id.
/// Re-fitting replaces the meter's bank wholesale; readers observe either
/// the old or the new set, never a partial one.
pub struct PeakPredictor {
    cfg: ForecastConfig,
    banks: HashMap<String, ModelBank>,
}

impl PeakPredictor {
    pub fn new(cfg: ForecastConfig) -> Self {
        Self {
            cfg,
            banks: HashMap::new(),
        }
    }

    pub fn state(&self, meter_id: &str) -> FitState {
        if self.banks.contains_key(meter_id) {
            FitState::Fitted
        } else {
            FitState::Unfitted
        }
    }

    /// Trains a fresh bank for `meter_id`, wholly replacing any previous
    /// one. On error no bank is installed and any previous bank survives.
    pub fn fit(
        &mut self,
        meter_id: &str,
        history: &[MeterReading],
    ) -> Result<FitReport, ForecastError> {
        let (bank, report) = ModelBank::fit(history, meter_id, &self.cfg)?;
        self.banks.insert(meter_id.to_string(), bank);
        Ok(report)
    }

    /// Peak forecasts for the meter of `current`, keyed by interval label.
    ///
    /// Every interval answers through exactly one of two paths writing the
    /// same entry shape: the trained regressors when the interval is
    /// trained and its lag features resolve, otherwise the historical-mean
    /// fallback. Intervals with neither a trained model nor observed
    /// history are omitted with a warning, never silently zeroed.
    pub fn predict_peaks(
        &self,
        current: &MeterReading,
        lookback: &[MeterReading],
    ) -> Result<BTreeMap<String, PeakPrediction>, ForecastError> {
        let bank = self.banks.get(&current.meter_id).ok_or_else(|| {
            ForecastError::Unfitted(format!(
                "predict_peaks called before fit for meter {}",
                current.meter_id
            ))
        })?;

        // Window = lookback plus the latest reading, chronological.
        let mut window: Vec<MeterReading> = lookback.to_vec();
        if window.last().map(|r| r.ts) != Some(current.ts) {
            window.push(current.clone());
        }
        let now = current.fractional_hour();

        let mut out = BTreeMap::new();
        for model in bank.models() {
            let latest = window
                .iter()
                .rev()
                .find(|r| model.interval.contains(r.hour_of_day()));

            let modeled = latest.and_then(|r| {
                let fv =
                    features::build_features(r.ts, &current.meter_id, &window, &bank.intervals)
                        .ok()?;
                let row = fv.model_row(&self.cfg.training)?;
                model.predict_row(&row)
            });

            let (kw, hour, source) = match modeled {
                Some((kw, hour)) => (kw, hour, PredictionSource::Model),
                None if model.observed_days > 0 => {
                    metrics::counter!("fallback_predictions_total").increment(1);
                    (
                        model.mean_peak_kw,
                        model.mean_peak_hour(),
                        PredictionSource::Fallback,
                    )
                }
                None => {
                    tracing::warn!(
                        meter_id = %current.meter_id,
                        interval = %model.interval.label,
                        "no trained model and no observed history, omitting interval"
                    );
                    continue;
                }
            };

            let hour = hour.rem_euclid(24.0);
            let minutes = minutes_until(hour, now);

            out.insert(
                model.interval.label.clone(),
                PeakPrediction {
                    interval_label: model.interval.label.clone(),
                    predicted_peak_kw: kw.max(0.0),
                    predicted_peak_hour: hour,
                    minutes_until_peak: minutes,
                    source,
                },
            );
        }

        Ok(out)
    }
}

/// Minutes from `now` (fractional hour-of-day) until the next occurrence of
/// `peak_hour`. Wraps across midnight; a peak just behind `now` rounds to
/// 1439, not 0.
fn minutes_until(peak_hour: f64, now: f64) -> u32 {
    let minutes = ((peak_hour - now).rem_euclid(24.0) * 60.0).round() as u32;
    minutes.min(1439)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{hourly_series, jitter};

    fn predictor() -> PeakPredictor {
        PeakPredictor::new(ForecastConfig::default())
    }

    fn peaky_series(days: u32, peak_hour: u8) -> Vec<MeterReading> {
        hourly_series(days, move |d, h| {
            if h == peak_hour {
                100.0 + jitter(u64::from(d))
            } else {
                20.0 + jitter(u64::from(d) * 24 + u64::from(h)) * 0.5
            }
        })
    }

    fn split_last(history: &[MeterReading]) -> (&[MeterReading], &MeterReading) {
        let (lookback, current) = history.split_at(history.len() - 1);
        (lookback, &current[0])
    }

    #[test]
    fn recovers_known_peak_amount_and_hour() {
        let history = peaky_series(14, 18);
        let mut predictor = predictor();
        predictor.fit("m-1", &history).unwrap();

        let (lookback, current) = split_last(&history);
        let predictions = predictor.predict_peaks(current, lookback).unwrap();

        let peak = &predictions["peak-1"];
        assert!(
            (peak.predicted_peak_kw - 100.0).abs() <= 10.0,
            "amount {}",
            peak.predicted_peak_kw
        );
        assert!(
            (peak.predicted_peak_hour - 18.0).abs() <= 1.0,
            "hour {}",
            peak.predicted_peak_hour
        );
        assert_eq!(peak.source, PredictionSource::Model);
    }

    #[test]
    fn forty_eight_hour_lookback_still_answers_every_interval() {
        // With only 48 h of lookback the weekly lag cannot resolve, so the
        // engine degrades to the historical-mean fallback instead of
        // failing or emitting zeros.
        let history = peaky_series(14, 18);
        let mut predictor = predictor();
        predictor.fit("m-1", &history).unwrap();

        let (all_lookback, current) = split_last(&history);
        let lookback = &all_lookback[all_lookback.len() - 48..];
        let predictions = predictor.predict_peaks(current, lookback).unwrap();

        let peak = &predictions["peak-1"];
        assert_eq!(peak.source, PredictionSource::Fallback);
        assert!((peak.predicted_peak_kw - 100.0).abs() <= 10.0);
        assert!((peak.predicted_peak_hour - 18.0).abs() <= 1.0);
        assert!(predictions.contains_key("base-1"));
    }

    #[test]
    fn eta_is_wraparound_aware_and_bounded() {
        let history = peaky_series(14, 18);
        let mut predictor = predictor();
        predictor.fit("m-1", &history).unwrap();

        let (lookback, current) = split_last(&history);
        let predictions = predictor.predict_peaks(current, lookback).unwrap();

        // Current time is hour 23; an hour-18 peak refers to tomorrow.
        assert_eq!(current.hour_of_day(), 23);
        for p in predictions.values() {
            assert!(p.minutes_until_peak < 1440);
        }
        let peak = &predictions["peak-1"];
        assert_eq!(
            peak.minutes_until_peak,
            minutes_until(peak.predicted_peak_hour, 23.0)
        );
        assert!(peak.minutes_until_peak > 17 * 60);
    }

    #[test]
    fn eta_never_folds_a_full_day_back_to_zero() {
        // A peak fractionally behind the current time is almost a full day
        // away; rounding must not wrap it to zero minutes.
        assert_eq!(minutes_until(22.9999, 23.0), 1439);
        assert_eq!(minutes_until(23.0, 23.0), 0);
        assert_eq!(minutes_until(18.0, 23.0), 19 * 60);
        assert_eq!(minutes_until(1.0, 23.0), 2 * 60);
    }

    #[test]
    fn midnight_wrapping_peak_predicts_inside_its_interval() {
        // Peak alternates between 23:00 and 00:00, producing an interval
        // that wraps midnight. Predicted hours must stay near the wrap,
        // never regress toward midday.
        let history = hourly_series(14, |d, h| {
            let peak = (d % 2 == 0 && h == 23) || (d % 2 == 1 && h == 0);
            if peak {
                100.0 + jitter(u64::from(d))
            } else {
                20.0 + jitter(u64::from(d) * 24 + u64::from(h)) * 0.5
            }
        });
        let mut predictor = predictor();
        predictor.fit("m-1", &history).unwrap();

        let (lookback, current) = split_last(&history);
        let predictions = predictor.predict_peaks(current, lookback).unwrap();

        let peak = predictions
            .values()
            .find(|p| p.interval_label.starts_with("peak"))
            .unwrap();
        assert!(
            peak.predicted_peak_hour >= 22.5 || peak.predicted_peak_hour < 1.5,
            "hour {} is outside the wrapping interval",
            peak.predicted_peak_hour
        );
        assert!(
            (peak.predicted_peak_kw - 100.0).abs() <= 10.0,
            "amount {}",
            peak.predicted_peak_kw
        );
        // Current time is 23:00; the peak is at most a few hours out.
        assert!(peak.minutes_until_peak <= 180);
    }

    #[test]
    fn untrained_intervals_fall_back_instead_of_zeroing() {
        // Four days partitions fine but leaves every interval untrained
        // (the weekly lag never resolves).
        let history = peaky_series(4, 18);
        let mut predictor = predictor();
        let report = predictor.fit("m-1", &history).unwrap();
        assert_eq!(report.trained, 0);

        let (lookback, current) = split_last(&history);
        let predictions = predictor.predict_peaks(current, lookback).unwrap();

        assert!(!predictions.is_empty());
        for p in predictions.values() {
            assert_eq!(p.source, PredictionSource::Fallback);
            assert!(p.predicted_peak_kw > 0.0);
            assert!(p.predicted_peak_kw.is_finite());
        }
    }

    #[test]
    fn refit_replaces_the_previous_bank() {
        let morning = peaky_series(14, 7);
        let evening = peaky_series(14, 18);

        let mut predictor = predictor();
        predictor.fit("m-1", &evening).unwrap();
        predictor.fit("m-1", &morning).unwrap();

        let (lookback, current) = split_last(&morning);
        let predictions = predictor.predict_peaks(current, lookback).unwrap();

        let peak = &predictions["peak-1"];
        assert!(
            (peak.predicted_peak_hour - 7.0).abs() <= 1.0,
            "expected the second dataset's pattern, got hour {}",
            peak.predicted_peak_hour
        );
    }

    #[test]
    fn predict_before_fit_is_an_explicit_error() {
        let history = peaky_series(14, 18);
        let predictor = predictor();
        let (lookback, current) = split_last(&history);
        let res = predictor.predict_peaks(current, lookback);
        assert!(matches!(res, Err(ForecastError::Unfitted(_))));
    }

    #[test]
    fn failed_fit_leaves_state_unfitted() {
        let mut predictor = predictor();
        let short = peaky_series(1, 18);
        assert!(predictor.fit("m-1", &short).is_err());
        assert_eq!(predictor.state("m-1"), FitState::Unfitted);

        let history = peaky_series(14, 18);
        predictor.fit("m-1", &history).unwrap();
        assert_eq!(predictor.state("m-1"), FitState::Fitted);
    }

    #[test]
    fn meters_are_independent() {
        let mut predictor = predictor();
        let history = peaky_series(14, 18);
        predictor.fit("m-1", &history).unwrap();

        let mut other = history.clone();
        for r in &mut other {
            r.meter_id = "m-2".to_string();
        }
        let (lookback, current) = split_last(&other);
        let res = predictor.predict_peaks(current, lookback);
        assert!(matches!(res, Err(ForecastError::Unfitted(_))));
    }
}
