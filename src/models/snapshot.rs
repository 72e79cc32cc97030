use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The complete aggregated usage document produced by one refresh.
///
/// Field names are camelCase on the wire because the dashboard front end
/// consumes this document directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub organizations: Vec<Organization>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub refreshed_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn user_count(&self) -> usize {
        self.organizations.iter().map(|o| o.users.len()).sum()
    }

    pub fn find_user(&self, email: &str) -> Option<&UserSummary> {
        self.organizations
            .iter()
            .flat_map(|o| o.users.iter())
            .find(|u| u.email == email)
    }

    pub fn find_organization(&self, name: &str) -> Option<&Organization> {
        self.organizations.iter().find(|o| o.name == name)
    }

    /// The `limit` organizations with the most total time, largest first.
    /// Ties keep snapshot order.
    pub fn top_organizations(&self, limit: usize) -> Vec<OrganizationSummary> {
        let mut summaries: Vec<OrganizationSummary> = self
            .organizations
            .iter()
            .map(|org| OrganizationSummary {
                name: org.name.clone(),
                total_time_minutes: org
                    .users
                    .iter()
                    .fold(0u64, |acc, u| acc.saturating_add(u.total_time_minutes)),
                users: org.users.len(),
            })
            .collect();
        summaries.sort_by(|a, b| b.total_time_minutes.cmp(&a.total_time_minutes));
        summaries.truncate(limit);
        summaries
    }
}

/// Per-organization totals for command-line summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSummary {
    pub name: String,
    pub total_time_minutes: u64,
    pub users: usize,
}

impl std::fmt::Display for OrganizationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}h {}m ({} users)",
            self.name,
            self.total_time_minutes / 60,
            self.total_time_minutes % 60,
            self.users
        )
    }
}

/// Users sharing an email domain. `name` is the domain itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub users: Vec<UserSummary>,
}

/// Output view of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub email: String,
    /// Whole minutes; the accumulator keeps fractional precision.
    pub total_time_minutes: u64,
    pub events: u64,
    pub flows: FlowCounts,
    /// Keyed by `YYYY-MM-DD`.
    pub daily_data: BTreeMap<String, DailyUsage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCounts {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    /// Capped estimate, rounded to one decimal.
    pub time_minutes: f64,
    pub events: u64,
}

/// The single cache slot: a snapshot plus the instant it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub written_at: DateTime<Utc>,
    pub snapshot: Snapshot,
}

impl CacheRecord {
    pub fn new(snapshot: Snapshot, written_at: DateTime<Utc>) -> Self {
        Self {
            written_at,
            snapshot,
        }
    }

    /// Milliseconds elapsed between the write and `now`. Negative if the
    /// record claims to come from the future (clock skew across restarts).
    pub fn age_millis(&self, now: DateTime<Utc>) -> i64 {
        (now - self.written_at).num_milliseconds()
    }

    /// Whether the record is strictly younger than `max_age_millis`.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age_millis: i64) -> bool {
        self.age_millis(now) < max_age_millis
    }

    /// Age rounded to the nearest whole minute.
    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (self.age_millis(now) as f64 / 60_000.0).round() as i64
    }
}
