//! Import of the markdown usage report into a dashboard snapshot.
//!
//! The report has one `### <domain>` section per organization with summary
//! lines, a `**Daily Activity:**` list and a `**Users:**` list. Importing runs
//! in three steps:
//!
//! 1. [`ReportImport::parse`] reads every section into a [`CustomerReport`].
//! 2. [`redistribute_capped_time`] replaces per-user times the report clipped
//!    at [`REPORT_SESSION_CAP_MINUTES`] with a share of the organization total.
//! 3. [`ReportImport::to_snapshot`] spreads each user's time over the
//!    organization's active days and emits a [`Snapshot`].

mod capped_time;
mod parse;
mod transform;

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

pub use capped_time::{REPORT_SESSION_CAP_MINUTES, redistribute_capped_time};
pub use transform::customer_to_organization;

use crate::models::{DateRange, FlowCounts, Snapshot};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to read report file {1}: {0}")]
    Io(std::io::Error, PathBuf),

    #[error("Invalid number in report: '{0}'")]
    InvalidNumber(String),

    #[error("Invalid date in report: '{0}'")]
    InvalidDate(String),
}

/// One organization section of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerReport {
    pub name: String,
    pub users: Vec<ReportUser>,
    /// Sum of user times after capped-time redistribution.
    pub total_time_minutes: u64,
    pub total_events: u64,
    pub flows: FlowCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    pub daily_activity: Vec<DailyActivity>,
    /// Labelled "Avg Session Time" in the report but holds the organization's
    /// total session minutes.
    pub avg_session_minutes: u64,
    pub active_users: u64,
}

impl CustomerReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            users: Vec::new(),
            total_time_minutes: 0,
            total_events: 0,
            flows: FlowCounts::default(),
            success_rate: None,
            daily_activity: Vec::new(),
            avg_session_minutes: 0,
            active_users: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportUser {
    pub email: String,
    pub events: u64,
    pub total_time_minutes: u64,
    /// Flows started; the report has no per-user completion counts.
    pub flows: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub events: u64,
}

/// A parsed report. Sections without users are dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportImport {
    pub customers: Vec<CustomerReport>,
}

impl ReportImport {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ReportError::Io(e, path.as_ref().to_path_buf()))?;

        Self::parse(&contents)
    }

    /// Parse report markdown.
    pub fn parse(contents: &str) -> Result<Self, ReportError> {
        let customers = parse::parse_sections(contents)?;
        tracing::debug!(customers = customers.len(), "Parsed usage report");
        Ok(Self { customers })
    }

    /// First and last day of daily activity across all organizations.
    pub fn activity_range(&self) -> Option<DateRange> {
        let mut dates = self
            .customers
            .iter()
            .flat_map(|c| c.daily_activity.iter().map(|d| d.date));
        let first = dates.next()?;
        let (start, end) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(DateRange { start, end })
    }

    pub fn to_snapshot(&self, range: DateRange, refreshed_at: DateTime<Utc>) -> Snapshot {
        Snapshot {
            organizations: self.customers.iter().map(customer_to_organization).collect(),
            start_date: range.start,
            end_date: range.end,
            refreshed_at,
        }
    }
}
