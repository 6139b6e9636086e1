/// Failure taxonomy for the forecasting engine.
///
/// `MissingFeature` is handled locally via the fallback heuristic during
/// prediction; it only surfaces from direct feature-building calls.
#[derive(thiserror::Error, Debug)]
pub enum ForecastError {
    #[error("insufficient history: {0}")]
    InsufficientHistory(String),
    #[error("missing feature: {0}")]
    MissingFeature(String),
    #[error("model not fitted: {0}")]
    Unfitted(String),
    #[error("training error: {0}")]
    Training(String),
}
