use std::sync::Arc;

use super::{RefreshService, ServeError};
use crate::{cache::SnapshotStore, clock::Clock, models::Snapshot};

/// What a read request gets back.
#[derive(Debug, Clone, PartialEq)]
pub enum ServeOutcome {
    /// Cached record within the freshness window.
    Fresh { snapshot: Snapshot, age_minutes: i64 },
    /// Cache was missing or expired and a refresh succeeded.
    Refreshed(Snapshot),
    /// Refresh failed; the last stored record is served.
    Stale { snapshot: Snapshot, error: String },
}

impl ServeOutcome {
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            ServeOutcome::Fresh { snapshot, .. }
            | ServeOutcome::Refreshed(snapshot)
            | ServeOutcome::Stale { snapshot, .. } => snapshot,
        }
    }
}

/// Decides per read whether to serve the cache, refresh, or degrade.
pub struct SnapshotService {
    store: Arc<dyn SnapshotStore>,
    refresher: Arc<RefreshService>,
    clock: Arc<dyn Clock>,
    max_age_millis: i64,
}

impl SnapshotService {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        refresher: Arc<RefreshService>,
        clock: Arc<dyn Clock>,
        max_age_millis: i64,
    ) -> Self {
        Self {
            store,
            refresher,
            clock,
            max_age_millis,
        }
    }

    /// `days_back` only matters when a refresh is triggered; a fresh hit
    /// ignores it.
    #[tracing::instrument(name = "snapshot.serve", skip(self))]
    pub async fn serve(&self, days_back: Option<u32>) -> Result<ServeOutcome, ServeError> {
        let now = self.clock.now();

        match self.store.read().await {
            Ok(Some(record)) if record.is_fresh(now, self.max_age_millis) => {
                let age_minutes = record.age_minutes(now);
                tracing::debug!(age_minutes, "Serving cached snapshot");
                return Ok(ServeOutcome::Fresh {
                    snapshot: record.snapshot,
                    age_minutes,
                });
            }
            Ok(_) => {}
            // An unreadable slot counts as a miss; a successful refresh overwrites it.
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backend = self.store.backend(),
                    "Failed to read snapshot cache, refreshing"
                );
            }
        }

        match self.refresher.refresh(days_back, now).await {
            Ok(snapshot) => Ok(ServeOutcome::Refreshed(snapshot)),
            Err(e) => self.fall_back(e.to_string()).await,
        }
    }

    /// Serve whatever record the store still holds, regardless of age.
    async fn fall_back(&self, error: String) -> Result<ServeOutcome, ServeError> {
        match self.store.read().await {
            Ok(Some(record)) => {
                tracing::warn!(
                    error = %error,
                    written_at = %record.written_at,
                    "Serving stale snapshot"
                );
                Ok(ServeOutcome::Stale {
                    snapshot: record.snapshot,
                    error,
                })
            }
            Ok(None) => {
                tracing::error!(error = %error, "No snapshot available");
                Err(ServeError::CacheUnavailable { reason: error })
            }
            Err(read_error) => {
                tracing::error!(
                    error = %error,
                    read_error = %read_error,
                    "No readable snapshot available"
                );
                Err(ServeError::CacheUnavailable {
                    reason: format!("{error} (cache read failed: {read_error})"),
                })
            }
        }
    }
}
