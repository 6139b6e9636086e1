use meter_domain::MeterReading;
use time::macros::datetime;
use time::Duration;

/// Synthetic hourly series starting on a Monday midnight, one reading per
/// hour for `days` days, with `kw(day, hour)` supplying the consumption.
pub fn hourly_series(days: u32, kw: impl Fn(u32, u8) -> f64) -> Vec<MeterReading> {
    let start = datetime!(2024-03-04 00:00:00 UTC);
    let mut out = Vec::with_capacity(days as usize * 24);
    for d in 0..days {
        for h in 0u8..24 {
            out.push(MeterReading {
                ts: start + Duration::days(i64::from(d)) + Duration::hours(i64::from(h)),
                meter_id: "m-1".to_string(),
                kw: kw(d, h),
                temperature: None,
            });
        }
    }
    out
}

/// Deterministic pseudo-noise in [-1, 1], free of the short linear
/// recurrences that would make lag columns collinear.
pub fn jitter(seed: u64) -> f64 {
    let h = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(31);
    (h >> 32) as f64 / f64::from(u32::MAX) * 2.0 - 1.0
}
