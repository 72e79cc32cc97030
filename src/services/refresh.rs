use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::RefreshError;
use crate::{
    aggregation::{FlowClassifier, GenericDomains, RowAggregator, SnapshotBuilder, group_by_domain},
    cache::SnapshotStore,
    config::AggregationConfig,
    models::{CacheRecord, DateRange, Snapshot},
    upstream::{QueryExecutor, UpstreamError},
};

/// Builds a new snapshot from the upstream and stores it in the cache slot.
pub struct RefreshService {
    executor: Arc<dyn QueryExecutor>,
    store: Arc<dyn SnapshotStore>,
    aggregator: RowAggregator,
    classifier: FlowClassifier,
    generic_domains: GenericDomains,
    default_days: u32,
}

impl RefreshService {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        store: Arc<dyn SnapshotStore>,
        config: &AggregationConfig,
    ) -> Self {
        Self {
            executor,
            store,
            aggregator: RowAggregator::new(config.daily_cap_minutes),
            classifier: FlowClassifier::default(),
            generic_domains: GenericDomains::new(&config.generic_domains),
            default_days: config.default_days,
        }
    }

    pub fn default_days(&self) -> u32 {
        self.default_days
    }

    /// Query, aggregate, store and return a new snapshot.
    ///
    /// The usage query is mandatory; the flow query is best effort and its
    /// failure leaves every flow counter at zero. The cache write is also
    /// best effort. Nothing is written when the usage query fails.
    #[tracing::instrument(name = "snapshot.refresh", skip(self, now))]
    pub async fn refresh(
        &self,
        days_back: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Snapshot, RefreshError> {
        if !self.executor.is_configured() {
            return Err(UpstreamError::NotConfigured.into());
        }

        let days_back = days_back.unwrap_or(self.default_days);
        let range = DateRange::ending_at(now, days_back);
        tracing::info!(%range, "Fetching usage data");

        let usage = self.executor.usage_rows(&range).await?;
        let mut accumulators = self.aggregator.aggregate(&usage);

        match self.executor.flow_rows(&range).await {
            Ok(flows) => {
                let stats = self.classifier.merge_flows(&mut accumulators, &flows);
                tracing::debug!(
                    merged = stats.merged,
                    unknown_users = stats.unknown_users,
                    unclassified = stats.unclassified,
                    "Merged flow counters"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Flow query failed, flow counters left at zero");
            }
        }

        let groups = group_by_domain(&accumulators, &self.generic_domains);
        let snapshot = SnapshotBuilder.build(groups, range, now);

        if let Err(e) = self
            .store
            .write(CacheRecord::new(snapshot.clone(), now))
            .await
        {
            tracing::warn!(
                error = %e,
                backend = self.store.backend(),
                "Failed to write snapshot cache"
            );
        }

        tracing::info!(
            usage_rows = usage.len(),
            users = accumulators.len(),
            organizations = snapshot.organizations.len(),
            "Snapshot refreshed"
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{
        cache::MemorySnapshotStore,
        models::{FlowCounts, RawFlowRow, RawUsageRow},
        services::test_utils::FakeExecutor,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 11, 18, 0, 0).unwrap()
    }

    fn service(
        executor: FakeExecutor,
    ) -> (RefreshService, Arc<FakeExecutor>, Arc<MemorySnapshotStore>) {
        let executor = Arc::new(executor);
        let store = Arc::new(MemorySnapshotStore::new());
        let service = RefreshService::new(
            executor.clone(),
            store.clone(),
            &AggregationConfig::default(),
        );
        (service, executor, store)
    }

    fn alice_rows() -> Vec<RawUsageRow> {
        vec![
            RawUsageRow::new("alice@acme.com", "2025-01-10", 100, 30),
            RawUsageRow::new("alice@acme.com", "2025-01-11", 80, 25),
            RawUsageRow::new("someone@gmail.com", "2025-01-11", 500, 200),
        ]
    }

    #[tokio::test]
    async fn test_refresh_builds_and_stores_snapshot() {
        let (service, executor, store) = service(
            FakeExecutor::new()
                .with_usage(alice_rows())
                .with_flows(vec![
                    RawFlowRow::new("alice@acme.com", "flow_started", 5),
                    RawFlowRow::new("alice@acme.com", "flow_completed", 4),
                    RawFlowRow::new("alice@acme.com", "flow_failed", 1),
                ]),
        );

        let snapshot = service.refresh(None, now()).await.unwrap();

        assert_eq!(executor.usage_calls(), 1);
        assert_eq!(executor.flow_calls(), 1);
        assert_eq!(snapshot.organizations.len(), 1);
        let alice = snapshot.find_user("alice@acme.com").unwrap();
        assert_eq!(alice.total_time_minutes, 55);
        assert_eq!(
            alice.flows,
            FlowCounts {
                started: 5,
                completed: 4,
                failed: 1
            }
        );
        assert!(snapshot.find_user("someone@gmail.com").is_none());
        assert_eq!(snapshot.refreshed_at, now());
        assert_eq!((snapshot.end_date - snapshot.start_date).num_days(), 60);

        let record = store.read().await.unwrap().unwrap();
        assert_eq!(record.written_at, now());
        assert_eq!(record.snapshot, snapshot);
    }

    #[tokio::test]
    async fn test_days_back_sets_range() {
        let (service, executor, _store) = service(FakeExecutor::new().with_usage(alice_rows()));

        let snapshot = service.refresh(Some(7), now()).await.unwrap();

        assert_eq!((snapshot.end_date - snapshot.start_date).num_days(), 7);
        let range = executor.last_range().unwrap();
        assert_eq!(range.start, snapshot.start_date);
        assert_eq!(range.end, snapshot.end_date);
    }

    #[tokio::test]
    async fn test_flow_failure_is_absorbed() {
        let (service, _executor, store) =
            service(FakeExecutor::new().with_usage(alice_rows()).failing_flows());

        let snapshot = service.refresh(None, now()).await.unwrap();

        let alice = snapshot.find_user("alice@acme.com").unwrap();
        assert_eq!(alice.flows, FlowCounts::default());
        assert_eq!(alice.total_time_minutes, 55);
        assert!(store.read().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_usage_failure_writes_nothing() {
        let (service, executor, store) = service(FakeExecutor::new().failing_usage(502));

        let err = service.refresh(None, now()).await.unwrap_err();

        assert!(matches!(
            err,
            RefreshError::UpstreamQuery(UpstreamError::Api { status: 502, .. })
        ));
        assert_eq!(executor.flow_calls(), 0);
        assert!(store.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_credential_short_circuits() {
        let (service, executor, store) = service(FakeExecutor::unconfigured());

        let err = service.refresh(Some(7), now()).await.unwrap_err();

        match err {
            RefreshError::Configuration(message) => {
                assert!(message.contains("POSTHOG_API_KEY not configured"));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
        assert_eq!(executor.usage_calls(), 0);
        assert_eq!(executor.flow_calls(), 0);
        assert!(store.read().await.unwrap().is_none());
    }
}
