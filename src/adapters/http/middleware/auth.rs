//! Authentication middleware and extractors for axum.
//!
//! This module provides:
//! - `auth_middleware` - Layer that validates the session cookie and injects the user into extensions
//! - `RequireAuth` - Extractor that requires authentication
//!
//! # Architecture
//!
//! The middleware uses the `SessionValidator` port, keeping it store-agnostic.
//! Whether sessions live in PostgreSQL or in a mock for testing, the
//! middleware doesn't change.
//!
//! ```text
//! Request → auth_middleware → injects AuthenticatedUser into extensions
//!                                      ↓
//!                              Handler → RequireAuth extractor reads from extensions
//! ```

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::SessionValidator;

/// Auth middleware state - the session validator and the cookie it reads.
#[derive(Clone)]
pub struct AuthState {
    pub validator: Arc<dyn SessionValidator>,
    pub cookie_name: Arc<str>,
}

impl AuthState {
    pub fn new(validator: Arc<dyn SessionValidator>, cookie_name: impl Into<Arc<str>>) -> Self {
        Self {
            validator,
            cookie_name: cookie_name.into(),
        }
    }
}

/// Authentication middleware that validates the session cookie.
///
/// This middleware:
/// 1. Reads the session id from the configured cookie
/// 2. Validates it using the `SessionValidator` port
/// 3. On success, injects `AuthenticatedUser` into request extensions
/// 4. On missing cookie, continues without injecting (for public routes)
/// 5. On invalid or expired session, returns 401 Unauthorized
/// 6. When the session store is down, returns 503
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let session_id = session_cookie(request.headers(), &auth.cookie_name).map(str::to_owned);

    let Some(session_id) = session_id else {
        // Handlers enforce authentication with RequireAuth
        return next.run(request).await;
    };

    match auth.validator.validate(&session_id).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(AuthError::ServiceUnavailable(msg)) => {
            tracing::error!("Auth service unavailable: {}", msg);
            AuthRejection::ServiceUnavailable.into_response()
        }
        Err(e) => {
            tracing::debug!("Session rejected: {}", e);
            AuthRejection::InvalidSession(e).into_response()
        }
    }
}

/// Finds a cookie value by name across all `Cookie` headers.
pub fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// Extractor that requires authentication.
///
/// If the auth middleware did not inject a user, returns 401 Unauthorized.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(RequireAuth)
            .ok_or(AuthRejection::Unauthenticated)
    }
}

/// Rejection type for authentication failures.
#[derive(Debug, Clone)]
pub enum AuthRejection {
    /// No session cookie was provided.
    Unauthenticated,
    /// A cookie was provided but the session is not usable.
    InvalidSession(AuthError),
    /// The session store could not be reached.
    ServiceUnavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message, code) = match &self {
            AuthRejection::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "Authentication required",
                "UNAUTHENTICATED",
            ),
            AuthRejection::InvalidSession(AuthError::SessionExpired) => {
                (StatusCode::UNAUTHORIZED, "Session expired", "UNAUTHENTICATED")
            }
            AuthRejection::InvalidSession(_) => {
                (StatusCode::UNAUTHORIZED, "Invalid session", "UNAUTHENTICATED")
            }
            AuthRejection::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Authentication service unavailable",
                "AUTH_UNAVAILABLE",
            ),
        };

        (
            status,
            Json(serde_json::json!({
                "error": message,
                "code": code
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(validator: MockSessionValidator) -> Router {
        let state = AuthState::new(Arc::new(validator), "auth_session");
        Router::new()
            .route(
                "/whoami",
                get(|RequireAuth(user): RequireAuth| async move { user.id.to_string() }),
            )
            .route("/public", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(state, auth_middleware))
    }

    fn request(uri: &str, cookie: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Cookie Extraction Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn session_cookie_finds_named_pair() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; auth_session=abc123; lang=en".parse().unwrap(),
        );
        assert_eq!(session_cookie(&headers, "auth_session"), Some("abc123"));
        assert_eq!(session_cookie(&headers, "missing"), None);
    }

    #[test]
    fn session_cookie_ignores_empty_and_prefix_matches() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, "auth_session_old=zzz".parse().unwrap());
        headers.append(header::COOKIE, "auth_session=".parse().unwrap());
        assert_eq!(session_cookie(&headers, "auth_session"), None);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Middleware Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn valid_session_reaches_handler() {
        let response = app(MockSessionValidator::new().with_test_user("sess-1", "user-1"))
            .oneshot(request("/whoami", Some("auth_session=sess-1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_cookie_is_rejected_by_extractor() {
        let response = app(MockSessionValidator::new())
            .oneshot(request("/whoami", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_cookie_still_reaches_public_routes() {
        let response = app(MockSessionValidator::new())
            .oneshot(request("/public", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_session_is_401() {
        let response = app(MockSessionValidator::new())
            .oneshot(request("/public", Some("auth_session=forged")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn session_store_outage_is_503() {
        let validator =
            MockSessionValidator::new().with_error(AuthError::service_unavailable("db down"));
        let response = app(validator)
            .oneshot(request("/whoami", Some("auth_session=sess-1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn auth_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthState>();
        assert_send_sync::<RequireAuth>();
    }
}
