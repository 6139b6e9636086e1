pub mod config;
pub mod error;
pub mod features;
pub mod metrics_server;
pub mod model;
pub mod observability;
pub mod partition;
pub mod predictor;
pub mod sources;

pub use error::ForecastError;
pub use predictor::PeakPredictor;

#[cfg(test)]
pub(crate) mod testutil;
