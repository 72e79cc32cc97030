//! Observability module providing structured logging.
//!
//! Logs go to stdout in pretty, compact, or JSON format. Request spans come
//! from `tower_http::trace::TraceLayer`; service spans from
//! `#[tracing::instrument]` on the refresh and read paths.

mod tracing_init;

pub use tracing_init::*;
