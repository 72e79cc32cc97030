use crate::upstream::UpstreamError;

/// Failures that escape a refresh.
///
/// Flow query failures and cache write failures are absorbed inside the
/// refresh and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    UpstreamQuery(UpstreamError),
}

impl From<UpstreamError> for RefreshError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::NotConfigured => RefreshError::Configuration(e.to_string()),
            other => RefreshError::UpstreamQuery(other),
        }
    }
}

/// Nothing can be served: refresh failed and no cached record is readable.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("No data available: {reason}")]
    CacheUnavailable { reason: String },
}
