/// One user-day aggregate as returned by the usage query.
///
/// `active_minutes` is the number of distinct minutes containing at least one
/// event for that user on that day. It is the only time signal available and
/// is deliberately approximate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUsageRow {
    pub email: String,
    /// Calendar day, `YYYY-MM-DD`.
    pub day: String,
    pub event_count: u64,
    pub active_minutes: u64,
}

impl RawUsageRow {
    pub fn new(
        email: impl Into<String>,
        day: impl Into<String>,
        event_count: u64,
        active_minutes: u64,
    ) -> Self {
        Self {
            email: email.into(),
            day: day.into(),
            event_count,
            active_minutes,
        }
    }
}

/// Count of one flow event name for one user over the whole window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFlowRow {
    pub email: String,
    pub event_name: String,
    pub count: u64,
}

impl RawFlowRow {
    pub fn new(email: impl Into<String>, event_name: impl Into<String>, count: u64) -> Self {
        Self {
            email: email.into(),
            event_name: event_name.into(),
            count,
        }
    }
}
