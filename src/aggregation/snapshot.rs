use chrono::{DateTime, Utc};

use super::{accumulator::UserAccumulator, organizations::DomainGroup};
use crate::models::{DateRange, Organization, Snapshot, UserSummary};

/// Assembles grouped accumulators into the output document.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn build(
        &self,
        groups: Vec<DomainGroup<'_>>,
        range: DateRange,
        refreshed_at: DateTime<Utc>,
    ) -> Snapshot {
        let organizations = groups
            .into_iter()
            .map(|group| Organization {
                name: group.domain,
                users: group
                    .users
                    .into_iter()
                    .map(|(email, acc)| summarize(email, acc))
                    .collect(),
            })
            .collect();

        Snapshot {
            organizations,
            start_date: range.start,
            end_date: range.end,
            refreshed_at,
        }
    }
}

fn summarize(email: &str, acc: &UserAccumulator) -> UserSummary {
    UserSummary {
        email: email.to_string(),
        total_time_minutes: acc.total_time_minutes.max(0.0).round() as u64,
        events: acc.total_events,
        flows: acc.flows,
        daily_data: acc.daily_data.clone(),
    }
}
