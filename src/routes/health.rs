//! Health check endpoints for load balancers and monitoring.

use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use serde::Serialize;

use crate::AppState;

/// Detailed health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "degraded"
    pub status: String,
    /// Service version
    pub version: String,
    pub cache: CacheStatus,
    pub upstream: UpstreamStatus,
}

/// State of the snapshot slot.
#[derive(Debug, Serialize)]
pub struct CacheStatus {
    pub backend: &'static str,
    pub readable: bool,
    pub has_snapshot: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fresh: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpstreamStatus {
    pub configured: bool,
}

/// Full health check.
///
/// Always 200: the service can serve cached data even when the upstream is
/// unconfigured or the cache is empty. Those cases report `degraded`.
#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let now = state.clock.now();
    let max_age_millis = state.config.cache.max_age_millis();

    let cache = match state.store.read().await {
        Ok(Some(record)) => CacheStatus {
            backend: state.store.backend(),
            readable: true,
            has_snapshot: true,
            age_minutes: Some(record.age_minutes(now)),
            fresh: Some(record.is_fresh(now, max_age_millis)),
            message: None,
        },
        Ok(None) => CacheStatus {
            backend: state.store.backend(),
            readable: true,
            has_snapshot: false,
            age_minutes: None,
            fresh: None,
            message: None,
        },
        Err(e) => CacheStatus {
            backend: state.store.backend(),
            readable: false,
            has_snapshot: false,
            age_minutes: None,
            fresh: None,
            message: Some(e.to_string()),
        },
    };
    let upstream = UpstreamStatus {
        configured: state.executor.is_configured(),
    };

    let status = if upstream.configured && cache.readable {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache,
        upstream,
    })
}

/// Liveness check. Returns 200 while the process is serving requests.
#[tracing::instrument(name = "health.liveness")]
pub async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{Router, body::Body};
    use chrono::{TimeZone, Utc};
    use http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        build_app,
        cache::MemorySnapshotStore,
        config::DashboardConfig,
        services::test_utils::{FakeExecutor, ManualClock},
    };

    fn test_app(executor: FakeExecutor) -> Router {
        let config = DashboardConfig::default();
        let state = AppState::with_components(
            config.clone(),
            Arc::new(executor),
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2025, 1, 11, 12, 0, 0).unwrap(),
            )),
        );
        build_app(&config, state)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_liveness() {
        let app = test_app(FakeExecutor::new());
        let (status, _) = get_json(&app, "/health/live").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_reports_cache_state() {
        let app = test_app(FakeExecutor::new());

        let (status, json) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["cache"]["backend"], "memory");
        assert_eq!(json["cache"]["has_snapshot"], false);

        get_json(&app, "/api/data").await;
        let (_, json) = get_json(&app, "/health").await;
        assert_eq!(json["cache"]["has_snapshot"], true);
        assert_eq!(json["cache"]["fresh"], true);
    }

    #[tokio::test]
    async fn test_health_degraded_without_credentials() {
        let app = test_app(FakeExecutor::unconfigured());

        let (status, json) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["upstream"]["configured"], false);
    }
}
