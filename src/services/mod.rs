mod error;
mod refresh;
mod serving;
#[cfg(test)]
pub(crate) mod test_utils;

use std::sync::Arc;

pub use error::{RefreshError, ServeError};
pub use refresh::RefreshService;
pub use serving::{ServeOutcome, SnapshotService};

use crate::{
    cache::SnapshotStore, clock::Clock, config::DashboardConfig, upstream::QueryExecutor,
};

/// Container for all services.
#[derive(Clone)]
pub struct Services {
    pub refresh: Arc<RefreshService>,
    pub snapshots: Arc<SnapshotService>,
}

impl Services {
    pub fn new(
        config: &DashboardConfig,
        executor: Arc<dyn QueryExecutor>,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let refresh = Arc::new(RefreshService::new(
            executor,
            store.clone(),
            &config.aggregation,
        ));
        let snapshots = Arc::new(SnapshotService::new(
            store,
            refresh.clone(),
            clock,
            config.cache.max_age_millis(),
        ));
        Self { refresh, snapshots }
    }
}
