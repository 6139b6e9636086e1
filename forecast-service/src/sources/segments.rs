use meter_domain::MeterReading;

/// Splits a chronologically sorted history at gaps larger than
/// `max_gap_hours` and returns the longest segment with at least `min_len`
/// readings. `None` when no segment qualifies.
///
/// Interval models assume an unbroken hourly stream; training across a gap
/// would pair lag features with the wrong day.
pub fn longest_contiguous_segment(
    readings: &[MeterReading],
    max_gap_hours: f64,
    min_len: usize,
) -> Option<&[MeterReading]> {
    if readings.is_empty() {
        return None;
    }

    let mut best: Option<&[MeterReading]> = None;
    let mut start = 0;
    for i in 1..=readings.len() {
        let ends_segment = i == readings.len() || {
            let gap = (readings[i].ts - readings[i - 1].ts).as_seconds_f64() / 3600.0;
            gap > max_gap_hours
        };
        if ends_segment {
            let seg = &readings[start..i];
            if seg.len() >= min_len && best.is_none_or(|b| seg.len() > b.len()) {
                best = Some(seg);
            }
            start = i;
        }
    }
    best
}
