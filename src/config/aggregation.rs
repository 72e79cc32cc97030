use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::models::MAX_DAYS_BACK;

/// Free-mail providers whose users are never grouped into an organization.
pub const DEFAULT_GENERIC_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "icloud.com",
    "protonmail.com",
    "aol.com",
    "mail.com",
    "mozmail.com",
];

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregationConfig {
    /// Length of the reporting window when a request does not specify `days`.
    #[serde(default = "default_days")]
    pub default_days: u32,

    /// Upper bound on the time credited to one user for one day, in minutes.
    #[serde(default = "default_daily_cap_minutes")]
    pub daily_cap_minutes: u64,

    /// Email domains excluded from organization grouping.
    #[serde(default = "default_generic_domains")]
    pub generic_domains: Vec<String>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            default_days: default_days(),
            daily_cap_minutes: default_daily_cap_minutes(),
            generic_domains: default_generic_domains(),
        }
    }
}

impl AggregationConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.default_days == 0 || self.default_days > MAX_DAYS_BACK {
            return Err(ConfigError::Validation(format!(
                "aggregation.default_days must be between 1 and {MAX_DAYS_BACK}"
            )));
        }
        if self.daily_cap_minutes == 0 {
            return Err(ConfigError::Validation(
                "aggregation.daily_cap_minutes must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_days() -> u32 {
    60
}

fn default_daily_cap_minutes() -> u64 {
    480 // 8 hours
}

fn default_generic_domains() -> Vec<String> {
    DEFAULT_GENERIC_DOMAINS
        .iter()
        .map(|d| d.to_string())
        .collect()
}
