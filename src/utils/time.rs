use chrono::{DateTime, Duration, NaiveDate, Utc};

/// This is the standard way of converting a date to a record file name.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Half-open `[start, end)` interval over which foreground durations are summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UsageWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window of `length` ending at `end`, `None` when the start falls outside the representable
    /// range.
    pub fn ending_at(end: DateTime<Utc>, length: Duration) -> Option<Self> {
        Some(Self {
            start: end.checked_sub_signed(length)?,
            end,
        })
    }

    pub fn from_millis(start_millis: i64, end_millis: i64) -> Option<Self> {
        Some(Self {
            start: DateTime::from_timestamp_millis(start_millis)?,
            end: DateTime::from_timestamp_millis(end_millis)?,
        })
    }

    pub fn start_millis(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_millis(&self) -> i64 {
        self.end.timestamp_millis()
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}
