use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Longest window a refresh may cover (about ten years).
pub const MAX_DAYS_BACK: u32 = 3650;

/// Inclusive calendar-date window covered by a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The window `[today - days_back, today]`, using UTC calendar dates.
    ///
    /// `days_back` is clamped to [`MAX_DAYS_BACK`].
    pub fn ending_at(now: DateTime<Utc>, days_back: u32) -> Self {
        let end = now.date_naive();
        let days_back = days_back.min(MAX_DAYS_BACK);
        let start = end
            .checked_sub_days(Days::new(u64::from(days_back)))
            .unwrap_or(end);
        Self { start, end }
    }

    /// Number of days between the two boundaries.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}
