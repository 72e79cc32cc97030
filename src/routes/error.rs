use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::Serialize;

use crate::services::{RefreshError, ServeError};

/// Message returned when neither a refresh nor the cache produced data.
pub const UNAVAILABLE_MESSAGE: &str = "No data available. Refresh failed.";

/// Error body shared by every API endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error(transparent)]
    Unavailable(#[from] ServeError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            ApiError::Refresh(RefreshError::Configuration(msg)) => {
                tracing::error!(error = %msg, "Refresh misconfigured");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(msg))
            }
            ApiError::Refresh(RefreshError::UpstreamQuery(err)) => {
                tracing::error!(error = %err, "Upstream query failed");
                (StatusCode::BAD_GATEWAY, ErrorResponse::new(err.to_string()))
            }
            ApiError::Unavailable(ServeError::CacheUnavailable { reason }) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: UNAVAILABLE_MESSAGE.to_string(),
                    details: Some(reason),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}
