//! Authentication extractors and routes

use authgate_auth::{AuthError, AuthenticatedSession, SessionToken, require_auth};
use axum::{
    Form, Json, Router,
    extract::{
        FromRequestParts, State,
        rejection::{FormRejection, JsonRejection},
    },
    http::{HeaderName, request::Parts},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

use super::types::{
    AccountResponse, ChangePasswordRequest, MessageResponse, PasswordResetRequest,
    RegisterRequest, TokenForm, TokenResponse, VerifyResponse,
};

const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

// ==================== Auth Extractors ====================

/// Extractor for the session validated by [`require_auth`]
pub struct RequireAuth(pub AuthenticatedSession);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedSession>()
            .cloned()
            .map(RequireAuth)
            .ok_or(ApiError::Auth(AuthError::MissingAuthHeader))
    }
}

fn login_outcome(result: &Result<SessionToken, AuthError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(AuthError::InvalidCredentials) => "invalid_credentials",
        Err(AuthError::InactiveAccount) => "inactive",
        Err(AuthError::MalformedInput(_)) => "rejected",
        Err(_) => "error",
    }
}

// ==================== Public Routes ====================

/// POST /auth/register
async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<AccountResponse>, ApiError> {
    let Json(request) = payload?;
    debug!("Registration attempt for {}", request.email);

    let account = state
        .authority
        .register(&request.email, &request.password)
        .await?;

    metrics::counter!("authgate_registrations_total").increment(1);
    Ok(Json(account.into()))
}

/// POST /auth/token
async fn token(
    State(state): State<AppState>,
    payload: Result<Form<TokenForm>, FormRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Form(form) = payload?;
    debug!("Login attempt for {}", form.username);

    let result = state
        .authority
        .authenticate(&form.username, &form.password)
        .await;
    metrics::counter!("authgate_logins_total", "outcome" => login_outcome(&result)).increment(1);
    let session = result?;

    Ok(Json(TokenResponse {
        expires_in: session.expires_in(Utc::now()),
        access_token: session.token,
        token_type: "bearer".to_string(),
    }))
}

/// POST /auth/password-reset
async fn password_reset(
    State(state): State<AppState>,
    payload: Result<Json<PasswordResetRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;
    state.authority.request_password_reset(&request.email).await;

    Ok(Json(MessageResponse::new(
        "If the email exists, a reset link has been sent",
    )))
}

// ==================== Authenticated Routes ====================

/// GET /auth/verify
async fn verify(RequireAuth(session): RequireAuth) -> impl IntoResponse {
    let user_id = session.account.id;
    (
        [(USER_ID_HEADER, user_id.to_string())],
        Json(VerifyResponse {
            valid: true,
            user_id,
        }),
    )
}

/// POST /auth/logout
async fn logout(
    RequireAuth(session): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .authority
        .logout(&session.token, session.account.id)
        .await?;

    metrics::counter!("authgate_logouts_total").increment(1);
    Ok(Json(MessageResponse::new("Successfully logged out")))
}

/// POST /auth/change-password
async fn change_password(
    RequireAuth(session): RequireAuth,
    State(state): State<AppState>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;

    state
        .authority
        .change_password(
            &session.account,
            &request.current_password,
            &request.new_password,
        )
        .await?;

    Ok(Json(MessageResponse::new("Password updated successfully")))
}

/// Create auth routes
pub fn routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/verify", get(verify))
        .route("/auth/logout", post(logout))
        .route("/auth/change-password", post(change_password))
        .route_layer(middleware::from_fn_with_state(
            state.authority.clone(),
            require_auth,
        ));

    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/token", post(token))
        .route("/auth/password-reset", post(password_reset))
        .merge(protected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::create_router;
    use authgate_auth::{CredentialHasher, HashCost, MemoryStore, SessionAuthority, TokenConfig};
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use chrono::Duration;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    const EMAIL: &str = "user@example.com";
    const PASSWORD: &str = "Str0ng!Pass";
    // Form encoding of EMAIL and PASSWORD
    const LOGIN_FORM: &str = "username=user%40example.com&password=Str0ng%21Pass";

    fn build_app() -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let hasher = CredentialHasher::new(HashCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let authority = Arc::new(SessionAuthority::new(
            &TokenConfig::new("test-secret-key", Duration::minutes(30)),
            hasher,
            store.clone(),
            store.clone(),
        ));

        (create_router(AppState::new(authority), None), store)
    }

    fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    fn form_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/auth/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register_and_login(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/register",
                json!({ "email": EMAIL, "password": PASSWORD }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(form_request(LOGIN_FORM)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_register_response_hides_hash() {
        let (app, _) = build_app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/auth/register",
                json!({ "email": EMAIL, "password": PASSWORD }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["email"], EMAIL);
        assert_eq!(body["is_active"], true);
        assert_eq!(body["is_admin"], false);
        assert!(body.get("password_hash").is_none());
        assert!(body["last_login"].is_null());
    }

    #[tokio::test]
    async fn test_register_errors() {
        let (app, _) = build_app();
        register_and_login(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/register",
                json!({ "email": EMAIL, "password": PASSWORD }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/register",
                json!({ "email": "other@example.com", "password": "nouppercase1!" }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["detail"],
            "Password must contain at least one uppercase letter"
        );

        let response = app
            .oneshot(json_request(
                "POST",
                "/auth/register",
                json!({ "email": "other@example.com" }),
                None,
            ))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_login_issues_bearer_token() {
        let (app, _) = build_app();
        register_and_login(&app).await;

        let response = app.oneshot(form_request(LOGIN_FORM)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["token_type"], "bearer");
        let expires_in = body["expires_in"].as_i64().unwrap();
        assert!(expires_in > 29 * 60 && expires_in <= 30 * 60);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (app, _) = build_app();
        register_and_login(&app).await;

        let wrong_password = app
            .clone()
            .oneshot(form_request("username=user%40example.com&password=Wr0ng%21Pass"))
            .await
            .unwrap();
        let unknown_email = app
            .oneshot(form_request("username=nobody%40example.com&password=Str0ng%21Pass"))
            .await
            .unwrap();

        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let first = body_json(wrong_password).await;
        let second = body_json(unknown_email).await;
        assert_eq!(first, second);
        assert_eq!(first["detail"], "Incorrect email or password");
    }

    #[tokio::test]
    async fn test_verify_reports_user_id() {
        let (app, _) = build_app();
        let token = register_and_login(&app).await;

        let response = app
            .oneshot(bearer_request("GET", "/auth/verify", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-user-id"], "1");

        let body = body_json(response).await;
        assert_eq!(body["valid"], true);
        assert_eq!(body["user_id"], 1);
    }

    #[tokio::test]
    async fn test_verify_accepts_advertised_token_type() {
        let (app, _) = build_app();
        let token = register_and_login(&app).await;

        let response = app
            .oneshot(
                Request::get("/auth/verify")
                    .header(header::AUTHORIZATION, format!("bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_verify_requires_token() {
        let (app, _) = build_app();

        let response = app
            .clone()
            .oneshot(Request::get("/auth/verify").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(bearer_request("GET", "/auth/verify", "garbage"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await["detail"],
            "Could not validate credentials"
        );
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let (app, store) = build_app();
        let token = register_and_login(&app).await;

        let response = app
            .clone()
            .oneshot(bearer_request("POST", "/auth/logout", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "Successfully logged out");
        assert_eq!(store.revocation_count(), 1);

        let response = app
            .oneshot(bearer_request("GET", "/auth/verify", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_change_password() {
        let (app, _) = build_app();
        let token = register_and_login(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/change-password",
                json!({ "current_password": "Wr0ng!Pass", "new_password": "N3w!Password" }),
                Some(&token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["detail"], "Incorrect password");

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/change-password",
                json!({ "current_password": PASSWORD, "new_password": "N3w!Password" }),
                Some(&token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["message"],
            "Password updated successfully"
        );

        let response = app.oneshot(form_request(LOGIN_FORM)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_password_reset_is_uniform() {
        let (app, _) = build_app();
        register_and_login(&app).await;

        let mut bodies = Vec::new();
        for email in [EMAIL, "nobody@example.com"] {
            let response = app
                .clone()
                .oneshot(json_request(
                    "POST",
                    "/auth/password-reset",
                    json!({ "email": email }),
                    None,
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            bodies.push(body_json(response).await);
        }

        assert_eq!(bodies[0], bodies[1]);
    }

    #[tokio::test]
    async fn test_store_outage_is_service_unavailable() {
        let (app, store) = build_app();
        let token = register_and_login(&app).await;
        store.set_offline(true);

        let response = app
            .clone()
            .oneshot(bearer_request("GET", "/auth/verify", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app.oneshot(form_request(LOGIN_FORM)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_ping_and_health() {
        let (app, _) = build_app();

        let response = app
            .clone()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await, json!({ "message": "pong" }));

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }
}
