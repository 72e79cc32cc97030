//! Snapshot refresh worker.
//!
//! Keeps the cache slot warm so reads are served from a fresh snapshot
//! instead of paying for an inline refresh.
//!
//! - Errors don't crash the worker, just log and retry next interval
//! - A failed pass leaves the previous snapshot in place
//! - The first pass runs immediately on startup

use std::{sync::Arc, time::Instant};

use tokio_util::sync::CancellationToken;

use crate::{
    clock::Clock,
    config::SnapshotRefreshConfig,
    services::{RefreshError, RefreshService},
};

/// Results from a single refresh pass.
#[derive(Debug)]
pub struct RefreshRunResult {
    pub organizations: usize,
    pub users: usize,
    pub duration_ms: u64,
}

/// Starts the snapshot refresh worker.
///
/// Runs until `shutdown` is cancelled.
pub async fn start_snapshot_refresh_worker(
    refresher: Arc<RefreshService>,
    clock: Arc<dyn Clock>,
    config: SnapshotRefreshConfig,
    shutdown: CancellationToken,
) {
    if !config.enabled {
        tracing::info!("Snapshot refresh worker disabled by configuration");
        return;
    }

    tracing::info!(
        interval_secs = config.interval_secs,
        days = config.days.unwrap_or(refresher.default_days()),
        "Starting snapshot refresh worker"
    );

    let interval = std::time::Duration::from_secs(config.interval_secs);

    loop {
        match run_refresh(&refresher, clock.as_ref(), config.days).await {
            Ok(result) => {
                tracing::info!(
                    organizations = result.organizations,
                    users = result.users,
                    duration_ms = result.duration_ms,
                    "Scheduled snapshot refresh complete"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Scheduled snapshot refresh failed, keeping existing snapshot"
                );
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Snapshot refresh worker stopped");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// Run a single refresh pass.
async fn run_refresh(
    refresher: &RefreshService,
    clock: &dyn Clock,
    days: Option<u32>,
) -> Result<RefreshRunResult, RefreshError> {
    let start = Instant::now();
    let snapshot = refresher.refresh(days, clock.now()).await?;

    Ok(RefreshRunResult {
        organizations: snapshot.organizations.len(),
        users: snapshot.user_count(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        cache::{MemorySnapshotStore, SnapshotStore},
        config::AggregationConfig,
        models::RawUsageRow,
        services::test_utils::{FakeExecutor, ManualClock},
    };

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 11, 12, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_run_refresh_reports_counts() {
        let executor = Arc::new(FakeExecutor::new().with_usage(vec![
            RawUsageRow::new("alice@acme.com", "2025-01-10", 10, 5),
            RawUsageRow::new("bob@acme.com", "2025-01-10", 10, 5),
        ]));
        let refresher = RefreshService::new(
            executor,
            Arc::new(MemorySnapshotStore::new()),
            &AggregationConfig::default(),
        );

        let result = run_refresh(&refresher, clock().as_ref(), Some(7))
            .await
            .unwrap();
        assert_eq!(result.organizations, 1);
        assert_eq!(result.users, 2);
    }

    #[tokio::test]
    async fn test_disabled_worker_returns_immediately() {
        let executor = Arc::new(FakeExecutor::new());
        let refresher = Arc::new(RefreshService::new(
            executor.clone(),
            Arc::new(MemorySnapshotStore::new()),
            &AggregationConfig::default(),
        ));

        start_snapshot_refresh_worker(
            refresher,
            clock(),
            SnapshotRefreshConfig::default(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(executor.usage_calls(), 0);
    }

    #[tokio::test]
    async fn test_worker_refreshes_then_stops_on_shutdown() {
        let executor = Arc::new(FakeExecutor::new());
        let store = Arc::new(MemorySnapshotStore::new());
        let refresher = Arc::new(RefreshService::new(
            executor.clone(),
            store.clone(),
            &AggregationConfig::default(),
        ));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(start_snapshot_refresh_worker(
            refresher,
            clock(),
            SnapshotRefreshConfig {
                enabled: true,
                interval_secs: 3600,
                days: None,
            },
            shutdown.clone(),
        ));

        for _ in 0..100 {
            if executor.usage_calls() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(executor.usage_calls(), 1);
        assert!(store.read().await.unwrap().is_some());
    }
}
