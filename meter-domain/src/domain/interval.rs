/// A recurring contiguous block of hours-of-day sharing one load regime.
///
/// The range is half-open `[start_hour, end_hour)` and wraps at 24.
/// `start_hour == end_hour` denotes the degenerate full-day interval.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub index: usize,
    pub start_hour: u8,
    pub end_hour: u8,
    pub label: String,
}

impl Interval {
    pub fn contains(&self, hour: u8) -> bool {
        if self.start_hour == self.end_hour {
            true
        } else if self.start_hour < self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }

    pub fn len_hours(&self) -> u8 {
        if self.start_hour == self.end_hour {
            24
        } else if self.start_hour < self.end_hour {
            self.end_hour - self.start_hour
        } else {
            24 - self.start_hour + self.end_hour
        }
    }
}
