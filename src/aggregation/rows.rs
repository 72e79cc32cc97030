use super::accumulator::UsageAccumulators;
use crate::models::{DailyUsage, RawUsageRow};

/// Default per-user, per-day cap on credited time (8 hours).
pub const DEFAULT_DAILY_CAP_MINUTES: u64 = 480;

/// Lower-cases and trims an email, rejecting values without an `@`.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return None;
    }
    Some(email)
}

/// Round to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Folds per-user-day usage rows into per-user accumulators.
#[derive(Debug, Clone, Copy)]
pub struct RowAggregator {
    daily_cap_minutes: u64,
}

impl Default for RowAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_CAP_MINUTES)
    }
}

impl RowAggregator {
    pub fn new(daily_cap_minutes: u64) -> Self {
        Self { daily_cap_minutes }
    }

    /// Time credited for one user-day.
    pub fn time_estimate(&self, active_minutes: u64) -> f64 {
        active_minutes.min(self.daily_cap_minutes) as f64
    }

    pub fn aggregate(&self, rows: &[RawUsageRow]) -> UsageAccumulators {
        let mut accumulators = UsageAccumulators::new();
        let mut skipped = 0usize;

        for row in rows {
            let Some(email) = normalize_email(&row.email) else {
                skipped += 1;
                continue;
            };

            let estimate = self.time_estimate(row.active_minutes);
            let acc = accumulators.get_or_insert(&email);
            acc.total_events = acc.total_events.saturating_add(row.event_count);
            acc.total_time_minutes += estimate;
            // A repeated (email, day) pair replaces the day entry while the
            // totals above keep accumulating.
            acc.daily_data.insert(
                row.day.clone(),
                DailyUsage {
                    time_minutes: round1(estimate),
                    events: row.event_count,
                },
            );
        }

        if skipped > 0 {
            tracing::debug!(skipped, "Skipped usage rows without a valid email");
        }

        accumulators
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(email: &str, day: &str, events: u64, minutes: u64) -> RawUsageRow {
        RawUsageRow::new(email, day, events, minutes)
    }

    #[test]
    fn test_sums_time_across_days() {
        let accs = RowAggregator::default().aggregate(&[
            row("alice@acme.com", "2025-01-10", 100, 30),
            row("alice@acme.com", "2025-01-11", 80, 25),
        ]);

        let alice = accs.get("alice@acme.com").unwrap();
        assert_eq!(alice.total_time_minutes, 55.0);
        assert_eq!(alice.total_events, 180);
        assert_eq!(alice.daily_data.len(), 2);
        assert_eq!(alice.daily_data["2025-01-11"].time_minutes, 25.0);
        assert_eq!(alice.daily_data["2025-01-11"].events, 80);
    }

    #[test]
    fn test_event_total_saturates() {
        let accs = RowAggregator::default().aggregate(&[
            row("bulk@acme.com", "2025-01-10", u64::MAX, 10),
            row("bulk@acme.com", "2025-01-11", 5, 10),
        ]);

        let user = accs.get("bulk@acme.com").unwrap();
        assert_eq!(user.total_events, u64::MAX);
        assert_eq!(user.total_time_minutes, 20.0);
    }

    #[test]
    fn test_caps_each_day_at_eight_hours() {
        let accs = RowAggregator::default().aggregate(&[
            row("night@acme.com", "2025-01-10", 5000, 900),
            row("night@acme.com", "2025-01-11", 10, 15),
        ]);

        let user = accs.get("night@acme.com").unwrap();
        assert_eq!(user.daily_data["2025-01-10"].time_minutes, 480.0);
        assert_eq!(user.total_time_minutes, 495.0);
    }

    #[test]
    fn test_configured_cap() {
        let accs = RowAggregator::new(60).aggregate(&[row("a@acme.com", "2025-01-10", 1, 90)]);
        assert_eq!(accs.get("a@acme.com").unwrap().total_time_minutes, 60.0);
    }

    #[test]
    fn test_burst_counts_distinct_minutes_not_events() {
        // 200 events packed into three distinct minutes.
        let accs = RowAggregator::default().aggregate(&[row("bot@acme.com", "2025-01-10", 200, 3)]);
        let user = accs.get("bot@acme.com").unwrap();
        assert_eq!(user.total_time_minutes, 3.0);
        assert_eq!(user.total_events, 200);
    }

    #[test]
    fn test_merges_case_and_whitespace_variants() {
        let accs = RowAggregator::default().aggregate(&[
            row("Alice@Acme.com", "2025-01-10", 10, 5),
            row("  alice@acme.com ", "2025-01-11", 20, 6),
        ]);

        assert_eq!(accs.len(), 1);
        let alice = accs.get("alice@acme.com").unwrap();
        assert_eq!(alice.total_events, 30);
        assert_eq!(alice.total_time_minutes, 11.0);
    }

    #[test]
    fn test_skips_invalid_emails() {
        let accs = RowAggregator::default().aggregate(&[
            row("", "2025-01-10", 10, 5),
            row("not-an-email", "2025-01-10", 10, 5),
            row("   ", "2025-01-10", 10, 5),
        ]);
        assert!(accs.is_empty());
    }

    #[test]
    fn test_repeated_day_overwrites_entry_but_totals_accumulate() {
        let accs = RowAggregator::default().aggregate(&[
            row("a@acme.com", "2025-01-10", 10, 5),
            row("a@acme.com", "2025-01-10", 7, 3),
        ]);

        let user = accs.get("a@acme.com").unwrap();
        assert_eq!(user.total_events, 17);
        assert_eq!(user.total_time_minutes, 8.0);
        assert_eq!(user.daily_data.len(), 1);
        assert_eq!(user.daily_data["2025-01-10"].events, 7);
        assert_eq!(user.daily_data["2025-01-10"].time_minutes, 3.0);
    }

    #[test]
    fn test_total_events_independent_of_row_order() {
        let rows = vec![
            row("a@acme.com", "2025-01-10", 3, 1),
            row("b@acme.com", "2025-01-10", 4, 2),
            row("a@acme.com", "2025-01-11", 5, 3),
            row("b@acme.com", "2025-01-12", 6, 700),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let aggregator = RowAggregator::default();
        let forward = aggregator.aggregate(&rows);
        let backward = aggregator.aggregate(&reversed);

        for email in ["a@acme.com", "b@acme.com"] {
            let f = forward.get(email).unwrap();
            let b = backward.get(email).unwrap();
            assert_eq!(f.total_events, b.total_events);
            assert_eq!(f.total_time_minutes, b.total_time_minutes);
        }
        assert_eq!(forward.get("a@acme.com").unwrap().total_events, 8);
    }

    #[test]
    fn test_daily_sum_matches_total() {
        let accs = RowAggregator::default().aggregate(&[
            row("a@acme.com", "2025-01-10", 3, 12),
            row("a@acme.com", "2025-01-11", 5, 600),
            row("a@acme.com", "2025-01-12", 5, 0),
        ]);
        let user = accs.get("a@acme.com").unwrap();
        let daily_sum: f64 = user.daily_data.values().map(|d| d.time_minutes).sum();
        assert_eq!(round1(daily_sum), round1(user.total_time_minutes));
        for day in user.daily_data.values() {
            assert!(day.time_minutes <= 480.0);
        }
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(12.34), 12.3);
        assert_eq!(round1(12.36), 12.4);
        assert_eq!(round1(7.0), 7.0);
    }
}
