//! Upstream analytics queries.
//!
//! The aggregation core only sees [`QueryExecutor`]: given a date range it
//! returns raw usage rows (mandatory) and raw flow rows (optional).
//! [`PostHogClient`] is the production implementation.

mod error;
mod posthog;

use async_trait::async_trait;
pub use error::{UpstreamError, UpstreamResult};
pub use posthog::PostHogClient;

use crate::models::{DateRange, RawFlowRow, RawUsageRow};

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Whether credentials are present. Refreshes short-circuit when false.
    fn is_configured(&self) -> bool;

    /// One row per (user, day) with event count and distinct active minutes.
    async fn usage_rows(&self, range: &DateRange) -> UpstreamResult<Vec<RawUsageRow>>;

    /// One row per (user, flow event name) with the event count.
    async fn flow_rows(&self, range: &DateRange) -> UpstreamResult<Vec<RawFlowRow>>;
}
