//! API routes

mod auth;
mod health;
pub mod metrics;
mod types;

use axum::{Router, extract::DefaultBodyLimit};
use std::sync::Arc;

pub use auth::RequireAuth;

use crate::state::{AppState, MetricsHandle};

/// Request bodies are small JSON or form payloads
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let mut router = Router::new()
        .merge(health::routes())
        .merge(auth::routes(&state))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    // Add metrics endpoint if handle is provided
    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router
}
