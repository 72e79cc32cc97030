use std::time::Duration;

/// Error type for query executor operations.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("POSTHOG_API_KEY not configured")]
    NotConfigured,

    #[error("PostHog API {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("PostHog query timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl UpstreamError {
    /// HTTP status reported by the upstream, if the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for query executor operations.
pub type UpstreamResult<T> = Result<T, UpstreamError>;
