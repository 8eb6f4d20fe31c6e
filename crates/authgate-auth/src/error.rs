//! Authentication error types

use axum::http::{StatusCode, header::WWW_AUTHENTICATE};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::policy::PolicyViolation;
use crate::store::StoreError;

/// Coarse category an error is surfaced under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; the reason is shown to the caller
    Validation,
    /// Not authorized; details stay in the logs
    Authentication,
    /// Duplicate registration
    Conflict,
    /// Persistent store failure; the request aborts without retry
    Unavailable,
    Internal,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Weak password: {0}")]
    WeakPassword(PolicyViolation),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Account already exists")]
    AlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Inactive account")]
    InactiveAccount,

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Token expired")]
    Expired,

    #[error("Token revoked")]
    Revoked,

    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("Missing authorization header")]
    MissingAuthHeader,

    #[error("Invalid authorization header format")]
    InvalidAuthHeader,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::WeakPassword(_) | AuthError::MalformedInput(_) => ErrorKind::Validation,
            AuthError::AlreadyExists => ErrorKind::Conflict,
            AuthError::InvalidCredentials
            | AuthError::InactiveAccount
            | AuthError::Unauthenticated
            | AuthError::Expired
            | AuthError::Revoked
            | AuthError::IncorrectPassword
            | AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader => ErrorKind::Authentication,
            AuthError::StoreUnavailable(_) => ErrorKind::Unavailable,
            AuthError::PasswordHash(_) | AuthError::Jwt(_) => ErrorKind::Internal,
        }
    }
}

/// Store failures surface as `StoreUnavailable`.
///
/// A duplicate can only reach this conversion from an account write, so it
/// becomes `AlreadyExists`; revocation duplicates are absorbed before `?`.
impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => AuthError::AlreadyExists,
            StoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::WeakPassword(violation) => (StatusCode::BAD_REQUEST, violation.to_string()),
            AuthError::MalformedInput(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            AuthError::AlreadyExists => {
                (StatusCode::CONFLICT, "Email already registered".to_string())
            }
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Incorrect email or password".to_string(),
            ),
            AuthError::IncorrectPassword => {
                (StatusCode::BAD_REQUEST, "Incorrect password".to_string())
            }
            AuthError::StoreUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable".to_string(),
            ),
            AuthError::PasswordHash(_) | AuthError::Jwt(_) => {
                tracing::error!("{}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
            // Every other rejection looks the same from outside
            _ => (
                StatusCode::UNAUTHORIZED,
                "Could not validate credentials".to_string(),
            ),
        };

        let body = axum::Json(json!({
            "detail": message
        }));

        if status == StatusCode::UNAUTHORIZED {
            (status, [(WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AuthError::WeakPassword(PolicyViolation::TooShort).kind(),
            ErrorKind::Validation
        );
        assert_eq!(AuthError::AlreadyExists.kind(), ErrorKind::Conflict);
        assert_eq!(AuthError::Revoked.kind(), ErrorKind::Authentication);
        assert_eq!(AuthError::InactiveAccount.kind(), ErrorKind::Authentication);
        assert_eq!(
            AuthError::StoreUnavailable("down".into()).kind(),
            ErrorKind::Unavailable
        );
    }

    #[test]
    fn test_token_rejections_share_one_response() {
        for err in [
            AuthError::Unauthenticated,
            AuthError::Expired,
            AuthError::Revoked,
            AuthError::InactiveAccount,
        ] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");
        }
    }

    #[test]
    fn test_store_error_conversion() {
        assert!(matches!(
            AuthError::from(StoreError::Unavailable("timeout".into())),
            AuthError::StoreUnavailable(_)
        ));
        assert!(matches!(
            AuthError::from(StoreError::Duplicate("email".into())),
            AuthError::AlreadyExists
        ));
    }
}
