use time::OffsetDateTime;

/// One hourly-aligned consumption sample for a single meter.
///
/// Timestamps are UTC and strictly increasing within a meter's stream;
/// duplicate and gap screening happens upstream of this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReading {
    pub ts: OffsetDateTime,
    pub meter_id: String,
    /// Consumption in kW. Non-negative, validated upstream.
    pub kw: f64,
    /// Ambient temperature, when the merged stream carries one.
    pub temperature: Option<f64>,
}

impl MeterReading {
    pub fn hour_of_day(&self) -> u8 {
        self.ts.hour()
    }

    /// Hour-of-day including the minute fraction, in [0, 24).
    pub fn fractional_hour(&self) -> f64 {
        f64::from(self.ts.hour()) + f64::from(self.ts.minute()) / 60.0
    }
}
