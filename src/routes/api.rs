//! Dashboard data endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::{
    AppState,
    models::{MAX_DAYS_BACK, Snapshot},
    services::ServeOutcome,
};

pub fn get_api_routes() -> Router<AppState> {
    Router::new()
        .route("/data", get(api_data))
        .route("/refresh", get(api_refresh).post(api_refresh))
}

/// Query string accepted by both endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct DaysQuery {
    pub days: Option<String>,
}

impl DaysQuery {
    /// `None` when absent or blank; otherwise an integer in
    /// `1..=MAX_DAYS_BACK` or 400.
    pub fn days_back(&self) -> Result<Option<u32>, ApiError> {
        let Some(raw) = self.days.as_deref().map(str::trim) else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        match raw.parse::<u32>() {
            Ok(days) if (1..=MAX_DAYS_BACK).contains(&days) => Ok(Some(days)),
            _ => Err(ApiError::BadRequest(format!(
                "days must be an integer between 1 and {MAX_DAYS_BACK}, got '{raw}'"
            ))),
        }
    }
}

/// Snapshot plus the cache annotations of the read path.
#[derive(Debug, Serialize)]
pub struct DataResponse {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    #[serde(rename = "_cached", skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(rename = "_cacheAgeMinutes", skip_serializing_if = "Option::is_none")]
    pub cache_age_minutes: Option<i64>,
    #[serde(rename = "_stale", skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,
    #[serde(rename = "_error", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ServeOutcome> for DataResponse {
    fn from(outcome: ServeOutcome) -> Self {
        let plain = |snapshot: Snapshot| DataResponse {
            snapshot,
            cached: None,
            cache_age_minutes: None,
            stale: None,
            error: None,
        };
        match outcome {
            ServeOutcome::Fresh {
                snapshot,
                age_minutes,
            } => DataResponse {
                cached: Some(true),
                cache_age_minutes: Some(age_minutes),
                ..plain(snapshot)
            },
            ServeOutcome::Refreshed(snapshot) => plain(snapshot),
            ServeOutcome::Stale { snapshot, error } => DataResponse {
                stale: Some(true),
                error: Some(error),
                ..plain(snapshot)
            },
        }
    }
}

/// Latest snapshot, from cache when fresh.
///
/// Never returns an upstream error while any cached record exists; `503` only
/// when both the refresh and the cache came up empty.
#[tracing::instrument(name = "api.data", skip(state))]
pub async fn api_data(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<DataResponse>, ApiError> {
    let days_back = query.days_back()?;
    let outcome = state.services.snapshots.serve(days_back).await?;
    Ok(Json(outcome.into()))
}

/// Force a refresh and return the new snapshot.
#[tracing::instrument(name = "api.refresh", skip(state))]
pub async fn api_refresh(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Snapshot>, ApiError> {
    let days_back = query.days_back()?;
    let snapshot = state
        .services
        .refresh
        .refresh(days_back, state.clock.now())
        .await?;
    Ok(Json(snapshot))
}
