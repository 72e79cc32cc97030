//! PostHog usage dashboard backend.
//!
//! Queries PostHog for per-user activity, folds the rows into a snapshot
//! grouped by organization, and serves that snapshot from a single cache
//! slot that survives upstream outages. Snapshots can also be imported from
//! the markdown usage report.

pub mod aggregation;
pub mod cache;
pub mod clock;
pub mod config;
pub mod jobs;
pub mod models;
pub mod observability;
pub mod report;
pub mod routes;
pub mod services;
pub mod upstream;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::DashboardConfig>,
    pub services: services::Services,
    /// Snapshot slot shared by the read and refresh paths.
    pub store: Arc<dyn cache::SnapshotStore>,
    /// PostHog query client (or a fake in tests).
    pub executor: Arc<dyn upstream::QueryExecutor>,
    pub clock: Arc<dyn clock::Clock>,
}

impl AppState {
    /// Wire up the production components from configuration.
    pub fn new(config: config::DashboardConfig) -> Result<Self, upstream::UpstreamError> {
        let executor = Arc::new(upstream::PostHogClient::new(&config.posthog)?);
        let store = cache::create_store(&config.cache);

        tracing::debug!(
            host = %config.posthog.host,
            project_id = %config.posthog.project_id,
            configured = config.posthog.has_api_key(),
            cache_backend = store.backend(),
            "Application state configured"
        );

        Ok(Self::with_components(
            config,
            executor,
            store,
            Arc::new(clock::SystemClock),
        ))
    }

    /// Assemble state from explicit components.
    pub fn with_components(
        config: config::DashboardConfig,
        executor: Arc<dyn upstream::QueryExecutor>,
        store: Arc<dyn cache::SnapshotStore>,
        clock: Arc<dyn clock::Clock>,
    ) -> Self {
        let services =
            services::Services::new(&config, executor.clone(), store.clone(), clock.clone());
        Self {
            config: Arc::new(config),
            services,
            store,
            executor,
            clock,
        }
    }
}

pub fn build_app(config: &config::DashboardConfig, state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/health/live", get(routes::health::liveness))
        .nest("/api", routes::get_api_routes())
        .layer(config.server.cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
