//! Configuration module for the usage dashboard.
//!
//! The service is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax. When no file is given
//! the process falls back to the `POSTHOG_*` environment variables.
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [posthog]
//! api_key = "${POSTHOG_API_KEY}"
//! project_id = "54557"
//!
//! [cache]
//! type = "file"
//! path = "/tmp/posthog-dashboard-cache.json"
//! ```

mod aggregation;
mod cache;
mod jobs;
mod observability;
mod posthog;
mod server;

use std::path::Path;

pub use aggregation::*;
pub use cache::*;
pub use jobs::*;
pub use observability::*;
pub use posthog::*;
use serde::{Deserialize, Serialize};
pub use server::*;

/// Environment variable holding the PostHog personal API key.
pub const API_KEY_ENV: &str = "POSTHOG_API_KEY";
/// Environment variable overriding the PostHog project ID.
pub const PROJECT_ID_ENV: &str = "POSTHOG_PROJECT_ID";
/// Environment variable overriding the PostHog API host.
pub const HOST_ENV: &str = "POSTHOG_HOST";

/// Root configuration for the usage dashboard.
///
/// All sections are optional with defaults matching the hosted deployment
/// (PostHog EU cloud, `/tmp` cache file, one hour freshness).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream analytics backend.
    #[serde(default)]
    pub posthog: PostHogConfig,

    /// Snapshot cache slot.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Aggregation tuning (date window, daily cap, generic domains).
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Background jobs.
    #[serde(default)]
    pub jobs: JobsConfig,
}

impl DashboardConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let mut config: DashboardConfig = toml::from_str(&expanded)?;
        config.apply_env_fallbacks();
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration purely from the `POSTHOG_*` environment variables.
    ///
    /// This is the zero-config mode: defaults everywhere, credentials and
    /// upstream selection taken from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(project_id) = non_empty_env(PROJECT_ID_ENV) {
            config.posthog.project_id = project_id;
        }
        if let Some(host) = non_empty_env(HOST_ENV) {
            config.posthog.host = host;
        }
        config.apply_env_fallbacks();
        config.validate()?;
        Ok(config)
    }

    /// Fill the API key from the environment when the file does not set one.
    fn apply_env_fallbacks(&mut self) {
        if self.posthog.api_key.as_deref().is_none_or(str::is_empty) {
            self.posthog.api_key = non_empty_env(API_KEY_ENV);
        }
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.posthog.validate()?;
        self.cache.validate()?;
        self.aggregation.validate()?;
        self.jobs.validate()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Expand `${VAR_NAME}` references, leaving anything after a `#` untouched.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(format!("invalid interpolation pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);

            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
