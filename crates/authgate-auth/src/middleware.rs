//! Authentication middleware for Axum

use authgate_db::Account;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::authority::SessionAuthority;
use crate::error::AuthError;

/// A validated bearer token and the account it belongs to
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub account: Account,
    pub token: String,
}

/// Extract bearer token from authorization header
///
/// The scheme name is matched case-insensitively.
pub fn extract_bearer_token(header: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header
        .trim_start()
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

fn outcome_label(result: &Result<Account, AuthError>) -> &'static str {
    match result {
        Ok(_) => "valid",
        Err(AuthError::Expired) => "expired",
        Err(AuthError::Revoked) => "revoked",
        Err(AuthError::InactiveAccount) => "inactive",
        Err(AuthError::StoreUnavailable(_)) => "unavailable",
        Err(_) => "invalid",
    }
}

/// Authentication middleware
///
/// Requires a valid bearer token. On success the request carries an
/// [`AuthenticatedSession`] extension.
pub async fn require_auth(
    State(authority): State<Arc<SessionAuthority>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;
    let token = extract_bearer_token(header)?.to_string();

    let result = authority.validate(&token).await;
    metrics::counter!("authgate_token_validations_total", "outcome" => outcome_label(&result))
        .increment(1);
    let account = result?;

    debug!("Authenticated account: {} ({})", account.id, account.email);

    request
        .extensions_mut()
        .insert(AuthenticatedSession { account, token });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::TokenConfig;
    use crate::memory::MemoryStore;
    use crate::password::test_hasher;
    use axum::{
        Extension, Router,
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
    };
    use chrono::Duration;
    use tower::ServiceExt;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def").unwrap(), "abc.def");
        assert_eq!(extract_bearer_token("bearer abc.def").unwrap(), "abc.def");
        assert_eq!(extract_bearer_token("BEARER  abc.def ").unwrap(), "abc.def");
        assert!(matches!(
            extract_bearer_token("Bearerabc.def"),
            Err(AuthError::InvalidAuthHeader)
        ));
        assert!(matches!(
            extract_bearer_token("Basic dXNlcjpwYXNz"),
            Err(AuthError::InvalidAuthHeader)
        ));
        assert!(matches!(
            extract_bearer_token("Bearer "),
            Err(AuthError::InvalidAuthHeader)
        ));
    }

    async fn whoami(Extension(session): Extension<AuthenticatedSession>) -> String {
        session.account.email
    }

    async fn app() -> (Router, Arc<SessionAuthority>) {
        let store = Arc::new(MemoryStore::new());
        let authority = Arc::new(SessionAuthority::new(
            &TokenConfig::new("test-secret-key", Duration::minutes(30)),
            test_hasher(),
            store.clone(),
            store,
        ));
        authority
            .register("mw@example.com", "Str0ng!Pass")
            .await
            .unwrap();

        let router = Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(authority.clone(), require_auth));
        (router, authority)
    }

    fn request(auth: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri("/whoami");
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_passes() {
        let (router, authority) = app().await;
        let session = authority
            .authenticate("mw@example.com", "Str0ng!Pass")
            .await
            .unwrap();

        let response = router
            .clone()
            .oneshot(request(Some(&format!("Bearer {}", session.token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Clients echoing the advertised token_type send a lowercase scheme
        let response = router
            .oneshot(request(Some(&format!("bearer {}", session.token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_or_bad_header_is_unauthorized() {
        let (router, _) = app().await;

        for auth in [None, Some("Bearer not-a-token"), Some("Token abc")] {
            let response = router.clone().oneshot(request(auth)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
