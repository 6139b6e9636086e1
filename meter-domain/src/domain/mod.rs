mod interval;
mod prediction;
mod reading;

pub use interval::Interval;
pub use prediction::{PeakPrediction, PredictionSource};
pub use reading::MeterReading;
