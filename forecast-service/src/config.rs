use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Relative margin over the median hourly mean above which an hour
    /// counts as peak-flagged.
    pub peak_ratio: f64,
    /// Minimum number of readings required before a partition is derived.
    pub min_history_hours: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            peak_ratio: 0.15,
            min_history_hours: 72,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Intervals with fewer training rows than this stay untrained and
    /// answer via the fallback heuristic.
    pub min_training_rows: usize,
    /// Require and use the 7-day lag as a model input.
    pub use_weekly_lag: bool,
    /// Require and use ambient temperature as a model input.
    pub use_temperature: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_training_rows: 4,
            use_weekly_lag: true,
            use_temperature: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub partition: PartitionConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Input readings CSV (columns: ts, meter_id, kw, optional temperature).
    pub readings_csv: String,
    /// Trailing readings handed to predict as lookback. Defaults to eight
    /// days so the weekly lag stays available.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: usize,
    #[serde(default)]
    pub forecast: ForecastConfig,
    pub metrics: Option<MetricsConfig>,
}

fn default_lookback_hours() -> usize {
    192
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("FORECAST_CONFIG").unwrap_or_else(|_| "forecast-config.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        let cfg: AppConfig = toml::from_str(&contents)?;
        Ok(cfg)
    }
}
