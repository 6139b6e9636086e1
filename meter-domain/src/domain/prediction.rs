/// Which path produced a prediction entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PredictionSource {
    /// Trained per-interval regressors.
    Model,
    /// Historical per-interval means, used when the interval is untrained
    /// or required lag features are missing.
    Fallback,
}

/// Peak forecast for one interval. Produced fresh per predict call and
/// not persisted.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeakPrediction {
    pub interval_label: String,
    pub predicted_peak_kw: f64,
    /// Fractional hour-of-day in [0, 24).
    pub predicted_peak_hour: f64,
    /// Wraparound-aware ETA, always in [0, 1440). A peak earlier in clock
    /// time than now refers to the next day's occurrence.
    pub minutes_until_peak: u32,
    pub source: PredictionSource,
}
