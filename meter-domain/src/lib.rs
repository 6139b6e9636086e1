pub mod domain;

pub use domain::{Interval, MeterReading, PeakPrediction, PredictionSource};
