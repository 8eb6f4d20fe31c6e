//! Application state

use authgate_auth::SessionAuthority;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Handle used to render the Prometheus exposition
pub type MetricsHandle = PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub authority: Arc<SessionAuthority>,
}

impl AppState {
    pub fn new(authority: Arc<SessionAuthority>) -> Self {
        Self { authority }
    }
}
