use meter_domain::{Interval, MeterReading};

use crate::{config::PartitionConfig, error::ForecastError};

/// Mean consumption by hour-of-day over the supplied history.
///
/// Errors when the history is too short or some hour-of-day was never
/// observed; a profile with holes cannot partition the full day.
pub fn hourly_profile(
    history: &[MeterReading],
    cfg: &PartitionConfig,
) -> Result<[f64; 24], ForecastError> {
    if history.len() < cfg.min_history_hours {
        return Err(ForecastError::InsufficientHistory(format!(
            "{} readings, need at least {}",
            history.len(),
            cfg.min_history_hours
        )));
    }

    let mut sums = [0.0f64; 24];
    let mut counts = [0usize; 24];
    for r in history {
        let h = usize::from(r.hour_of_day());
        sums[h] += r.kw;
        counts[h] += 1;
    }

    let mut profile = [0.0f64; 24];
    for h in 0..24 {
        if counts[h] == 0 {
            return Err(ForecastError::InsufficientHistory(format!(
                "no readings at hour {h:02}"
            )));
        }
        profile[h] = sums[h] / counts[h] as f64;
    }
    Ok(profile)
}

fn median(values: &[f64; 24]) -> f64 {
    let mut sorted = *values;
    sorted.sort_by(|a, b| a.total_cmp(b));
    (sorted[11] + sorted[12]) / 2.0
}

/// Derives the recurring daily intervals for a meter.
///
/// Hours whose mean exceeds the median hourly mean by `peak_ratio` are
/// peak-flagged; contiguous flagged runs (wrapping across midnight) become
/// peak intervals and the gaps between them base intervals. A uniform
/// profile collapses to a single full-day interval. The result is
/// contiguous and exhaustive over [0, 24), ordered by start hour.
pub fn partition(
    history: &[MeterReading],
    cfg: &PartitionConfig,
) -> Result<Vec<Interval>, ForecastError> {
    let profile = hourly_profile(history, cfg)?;
    let threshold = median(&profile) * (1.0 + cfg.peak_ratio);
    let flags: [bool; 24] = core::array::from_fn(|h| profile[h] > threshold);

    if flags.iter().all(|&f| f == flags[0]) {
        let label = if flags[0] { "peak-1" } else { "base-1" };
        tracing::info!(interval = label, "uniform profile, single full-day interval");
        return Ok(vec![Interval {
            index: 0,
            start_hour: 0,
            end_hour: 0,
            label: label.to_string(),
        }]);
    }

    // Walk from the first flag transition so runs wrapping midnight stay whole.
    let start = (0..24)
        .find(|&h| flags[h] != flags[(h + 23) % 24])
        .unwrap_or(0);

    let mut runs: Vec<(usize, u8, bool)> = Vec::new(); // (start_hour, len, is_peak)
    let mut h = start;
    let mut consumed = 0;
    while consumed < 24 {
        let flag = flags[h];
        let run_start = h;
        let mut len = 0u8;
        while consumed < 24 && flags[h] == flag {
            len += 1;
            consumed += 1;
            h = (h + 1) % 24;
        }
        runs.push((run_start, len, flag));
    }

    runs.sort_by_key(|&(s, _, _)| s);

    let mut intervals = Vec::with_capacity(runs.len());
    let mut peak_n = 0u32;
    let mut base_n = 0u32;
    for (idx, (s, len, is_peak)) in runs.into_iter().enumerate() {
        let label = if is_peak {
            peak_n += 1;
            format!("peak-{peak_n}")
        } else {
            base_n += 1;
            format!("base-{base_n}")
        };
        intervals.push(Interval {
            index: idx,
            start_hour: s as u8,
            end_hour: ((s + usize::from(len)) % 24) as u8,
            label,
        });
    }

    for iv in &intervals {
        tracing::info!(
            interval = %iv.label,
            start_hour = iv.start_hour,
            end_hour = iv.end_hour,
            "derived interval"
        );
    }

    Ok(intervals)
}
