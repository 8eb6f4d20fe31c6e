//! API error types

use authgate_auth::AuthError;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body could not be parsed
    #[error("Rejected request: {1}")]
    Rejected(StatusCode, String),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Rejected(status, message) => {
                let body = axum::Json(json!({
                    "detail": message
                }));
                (status, body).into_response()
            }
            // Auth errors carry their own status, headers and message
            ApiError::Auth(e) => e.into_response(),
        }
    }
}
