//! In-process fakes for service and route tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::{
    clock::Clock,
    models::{DateRange, RawFlowRow, RawUsageRow},
    upstream::{QueryExecutor, UpstreamError, UpstreamResult},
};

/// Scripted [`QueryExecutor`] that counts calls.
pub struct FakeExecutor {
    configured: bool,
    usage: Vec<RawUsageRow>,
    flows: Vec<RawFlowRow>,
    usage_failure: Option<u16>,
    flows_fail: bool,
    usage_calls: AtomicUsize,
    flow_calls: AtomicUsize,
    last_range: Mutex<Option<DateRange>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self {
            configured: true,
            usage: Vec::new(),
            flows: Vec::new(),
            usage_failure: None,
            flows_fail: false,
            usage_calls: AtomicUsize::new(0),
            flow_calls: AtomicUsize::new(0),
            last_range: Mutex::new(None),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    pub fn with_usage(mut self, rows: Vec<RawUsageRow>) -> Self {
        self.usage = rows;
        self
    }

    pub fn with_flows(mut self, rows: Vec<RawFlowRow>) -> Self {
        self.flows = rows;
        self
    }

    pub fn failing_usage(mut self, status: u16) -> Self {
        self.usage_failure = Some(status);
        self
    }

    pub fn failing_flows(mut self) -> Self {
        self.flows_fail = true;
        self
    }

    pub fn usage_calls(&self) -> usize {
        self.usage_calls.load(Ordering::SeqCst)
    }

    pub fn flow_calls(&self) -> usize {
        self.flow_calls.load(Ordering::SeqCst)
    }

    pub fn last_range(&self) -> Option<DateRange> {
        *self.last_range.lock()
    }
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn usage_rows(&self, range: &DateRange) -> UpstreamResult<Vec<RawUsageRow>> {
        self.usage_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_range.lock() = Some(*range);
        if let Some(status) = self.usage_failure {
            return Err(UpstreamError::Api {
                status,
                message: "upstream unavailable".into(),
            });
        }
        Ok(self.usage.clone())
    }

    async fn flow_rows(&self, _range: &DateRange) -> UpstreamResult<Vec<RawFlowRow>> {
        self.flow_calls.fetch_add(1, Ordering::SeqCst);
        if self.flows_fail {
            return Err(UpstreamError::Api {
                status: 500,
                message: "flow query failed".into(),
            });
        }
        Ok(self.flows.clone())
    }
}

/// Clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}
