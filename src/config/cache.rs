use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Snapshot cache configuration.
///
/// The cache is a single best-effort slot holding the last good snapshot. It
/// is not a database: losing it only means the next read triggers a refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum CacheConfig {
    /// In-process slot. Lost on restart.
    Memory(MemoryCacheConfig),

    /// JSON file on local disk. Survives restarts on the same host.
    File(FileCacheConfig),
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::File(FileCacheConfig::default())
    }
}

impl CacheConfig {
    /// Freshness window in seconds.
    pub fn max_age_secs(&self) -> u64 {
        match self {
            CacheConfig::Memory(c) => c.max_age_secs,
            CacheConfig::File(c) => c.max_age_secs,
        }
    }

    /// Freshness window in milliseconds, saturating at `i64::MAX`.
    pub fn max_age_millis(&self) -> i64 {
        i64::try_from(self.max_age_secs())
            .map(|secs| secs.saturating_mul(1000))
            .unwrap_or(i64::MAX)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_age_secs() == 0 {
            return Err(ConfigError::Validation(
                "cache.max_age_secs must be greater than 0".into(),
            ));
        }
        if let CacheConfig::File(c) = self
            && c.path.as_os_str().is_empty()
        {
            return Err(ConfigError::Validation(
                "cache.path cannot be empty for the file cache".into(),
            ));
        }
        Ok(())
    }
}

/// In-memory cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryCacheConfig {
    /// Age after which the cached snapshot is refreshed on read.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
        }
    }
}

/// File cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileCacheConfig {
    /// Location of the snapshot file. Its parent directory is created on write.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Age after which the cached snapshot is refreshed on read.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

fn default_max_age_secs() -> u64 {
    3600 // 1 hour
}

fn default_path() -> PathBuf {
    std::env::temp_dir().join("posthog-dashboard-cache.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_age_millis() {
        assert_eq!(CacheConfig::default().max_age_millis(), 3_600_000);

        let config = CacheConfig::Memory(MemoryCacheConfig { max_age_secs: 90 });
        assert_eq!(config.max_age_millis(), 90_000);
    }

    #[test]
    fn test_max_age_millis_saturates() {
        let config = CacheConfig::Memory(MemoryCacheConfig {
            max_age_secs: u64::MAX,
        });
        assert_eq!(config.max_age_millis(), i64::MAX);
    }
}
