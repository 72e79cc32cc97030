use std::collections::BTreeMap;

use super::{CustomerReport, ReportUser};
use crate::{
    aggregation::round1,
    models::{DailyUsage, FlowCounts, Organization, UserSummary},
};

/// Convert a report section into a snapshot organization.
///
/// Report users carry only flows started, so completed and failed are zero.
pub fn customer_to_organization(customer: &CustomerReport) -> Organization {
    Organization {
        name: customer.name.clone(),
        users: customer
            .users
            .iter()
            .map(|user| UserSummary {
                email: user.email.clone(),
                total_time_minutes: user.total_time_minutes,
                events: user.events,
                flows: FlowCounts {
                    started: user.flows,
                    completed: 0,
                    failed: 0,
                },
                daily_data: daily_data(customer, user),
            })
            .collect(),
    }
}

/// Spread a user's time over the organization's active days.
///
/// Each day gets time in proportion to its share of organization events and
/// an event estimate scaled by the user's share of total events. Days with no
/// events are left out. With no daily events at all, time is split evenly.
fn daily_data(customer: &CustomerReport, user: &ReportUser) -> BTreeMap<String, DailyUsage> {
    let mut daily = BTreeMap::new();
    let days = &customer.daily_activity;
    if days.is_empty() || user.total_time_minutes == 0 {
        return daily;
    }

    let user_minutes = user.total_time_minutes as f64;
    let org_events = days
        .iter()
        .fold(0u64, |acc, d| acc.saturating_add(d.events));

    if org_events == 0 {
        let per_day = round1(user_minutes / days.len() as f64);
        for day in days {
            daily.insert(
                day.date.to_string(),
                DailyUsage {
                    time_minutes: per_day,
                    events: 0,
                },
            );
        }
        return daily;
    }

    let event_share = user.events as f64 / customer.total_events.max(1) as f64;
    for day in days.iter().filter(|d| d.events > 0) {
        let day_fraction = day.events as f64 / org_events as f64;
        daily.insert(
            day.date.to_string(),
            DailyUsage {
                time_minutes: round1(user_minutes * day_fraction),
                events: (day.events as f64 * event_share) as u64,
            },
        );
    }

    daily
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::report::DailyActivity;

    fn day(d: u32, events: u64) -> DailyActivity {
        DailyActivity {
            date: NaiveDate::from_ymd_opt(2025, 1, d).unwrap(),
            events,
        }
    }

    fn report_user(events: u64, minutes: u64) -> ReportUser {
        ReportUser {
            email: "user@acme.com".to_string(),
            events,
            total_time_minutes: minutes,
            flows: 4,
        }
    }

    fn customer(total_events: u64, days: Vec<DailyActivity>) -> CustomerReport {
        CustomerReport {
            total_events,
            daily_activity: days,
            ..CustomerReport::new("acme.com")
        }
    }

    #[test]
    fn test_time_follows_daily_event_share() {
        let c = customer(200, vec![day(1, 150), day(2, 0), day(3, 50)]);
        let daily = daily_data(&c, &report_user(100, 90));

        assert_eq!(daily.len(), 2);
        assert!(!daily.contains_key("2025-01-02"));
        assert_eq!(daily["2025-01-01"].time_minutes, 67.5);
        assert_eq!(daily["2025-01-01"].events, 75);
        assert_eq!(daily["2025-01-03"].time_minutes, 22.5);
        assert_eq!(daily["2025-01-03"].events, 25);
    }

    #[test]
    fn test_event_estimate_truncates() {
        let c = customer(3, vec![day(1, 1), day(2, 2)]);
        let daily = daily_data(&c, &report_user(1, 10));
        // one third of a single event is zero
        assert_eq!(daily["2025-01-01"].events, 0);
        assert_eq!(daily["2025-01-02"].events, 0);
        assert_eq!(daily["2025-01-01"].time_minutes, 3.3);
        assert_eq!(daily["2025-01-02"].time_minutes, 6.7);
    }

    #[test]
    fn test_no_daily_events_splits_time_evenly() {
        let c = customer(0, vec![day(1, 0), day(2, 0), day(3, 0), day(4, 0)]);
        let daily = daily_data(&c, &report_user(0, 10));

        assert_eq!(daily.len(), 4);
        for usage in daily.values() {
            assert_eq!(usage.time_minutes, 2.5);
            assert_eq!(usage.events, 0);
        }
    }

    #[test]
    fn test_no_daily_data_without_time_or_days() {
        let c = customer(10, vec![day(1, 10)]);
        assert!(daily_data(&c, &report_user(10, 0)).is_empty());

        let c = customer(10, vec![]);
        assert!(daily_data(&c, &report_user(10, 30)).is_empty());
    }

    #[test]
    fn test_customer_to_organization() {
        let c = CustomerReport {
            users: vec![report_user(10, 30)],
            ..customer(10, vec![day(1, 10)])
        };

        let org = customer_to_organization(&c);
        assert_eq!(org.name, "acme.com");
        assert_eq!(org.users.len(), 1);

        let user = &org.users[0];
        assert_eq!(user.email, "user@acme.com");
        assert_eq!(user.total_time_minutes, 30);
        assert_eq!(
            user.flows,
            FlowCounts {
                started: 4,
                completed: 0,
                failed: 0
            }
        );
        assert_eq!(user.daily_data["2025-01-01"].time_minutes, 30.0);
        assert_eq!(user.daily_data["2025-01-01"].events, 10);
    }
}
