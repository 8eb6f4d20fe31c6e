//! Authgate REST API
//!
//! Axum routes for registration, login, token verification, logout and
//! password management, plus health and Prometheus metrics endpoints.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
