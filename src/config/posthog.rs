use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// PostHog query API configuration.
///
/// The API key is optional at load time: a service without credentials still
/// starts and serves whatever snapshot is cached, but every refresh fails
/// with a configuration error.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostHogConfig {
    /// Personal API key, sent as a bearer token.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Project whose events are queried.
    #[serde(default = "default_project_id")]
    pub project_id: String,

    /// API host (region specific).
    #[serde(default = "default_host")]
    pub host: String,

    /// Per-query request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PostHogConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            project_id: default_project_id(),
            host: default_host(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// Keep the API key out of logs.
impl std::fmt::Debug for PostHogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostHogConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("project_id", &self.project_id)
            .field("host", &self.host)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl PostHogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Validation("posthog.host cannot be empty".into()));
        }
        if self.project_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "posthog.project_id cannot be empty".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "posthog.timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_project_id() -> String {
    "54557".to_string()
}

fn default_host() -> String {
    "https://eu.i.posthog.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}
