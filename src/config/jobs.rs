use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::models::MAX_DAYS_BACK;

/// Background job configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobsConfig {
    /// Periodic snapshot refresh so reads hit a warm cache.
    #[serde(default)]
    pub snapshot_refresh: SnapshotRefreshConfig,
}

impl JobsConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        self.snapshot_refresh.validate()
    }
}

/// Snapshot refresh worker configuration.
///
/// ```toml
/// [jobs.snapshot_refresh]
/// enabled = true
/// interval_secs = 3000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotRefreshConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between refreshes. Keep below `cache.max_age_secs` so readers
    /// never observe an expired slot.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Window used by scheduled refreshes; defaults to `aggregation.default_days`.
    #[serde(default)]
    pub days: Option<u32>,
}

impl Default for SnapshotRefreshConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval_secs(),
            days: None,
        }
    }
}

impl SnapshotRefreshConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "jobs.snapshot_refresh.interval_secs must be greater than 0".into(),
            ));
        }
        if let Some(days) = self.days
            && (days == 0 || days > MAX_DAYS_BACK)
        {
            return Err(ConfigError::Validation(format!(
                "jobs.snapshot_refresh.days must be between 1 and {MAX_DAYS_BACK}"
            )));
        }
        Ok(())
    }
}

fn default_interval_secs() -> u64 {
    3000 // 50 minutes, inside the default one hour freshness window
}
