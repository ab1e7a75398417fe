//! Router assembly and the shared middleware stack.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::{middleware, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::application::StreamMessageHandler;
use crate::config::ServerConfig;
use crate::ports::{ConversationRepository, SessionValidator};

use super::conversation::{completion_routes, conversation_routes, ConversationAppState};
use super::health::{health_routes, HealthState};
use super::middleware::{auth_middleware, AuthState};

/// Everything the HTTP layer needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub relay: StreamMessageHandler,
    pub repository: Arc<dyn ConversationRepository>,
    pub session_validator: Arc<dyn SessionValidator>,
    pub session_cookie_name: String,
}

/// Builds the full `/api` router.
///
/// Layers, outermost first: request id, tracing, request id propagation,
/// CORS, compression. Session auth wraps the conversation and completion
/// routes only, so the health check never sees the cookie. Non-streaming
/// routes also get a request timeout.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let conversations = ConversationAppState::new(state.relay, state.repository);
    let health = HealthState {
        environment: config.environment,
    };
    let auth = AuthState::new(state.session_validator, state.session_cookie_name);
    let timeout = TimeoutLayer::new(config.request_timeout());

    let authenticated = Router::new()
        .merge(
            conversation_routes()
                .with_state(conversations.clone())
                .layer(timeout.clone()),
        )
        .merge(completion_routes().with_state(conversations))
        .layer(middleware::from_fn_with_state(auth, auth_middleware));

    let api = Router::new()
        .merge(authenticated)
        .merge(health_routes().with_state(health).layer(timeout));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .nest("/api", api)
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config.cors_origins_list()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(trace_layer)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Session cookies need credentialed CORS, which requires explicit origins.
/// With no origins configured, cross-origin requests get no CORS headers.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::memory::InMemoryConversationRepository;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        let repository = Arc::new(InMemoryConversationRepository::new());
        let state = AppState {
            relay: StreamMessageHandler::new(repository.clone(), Arc::new(MockAIProvider::new())),
            repository,
            session_validator: Arc::new(MockSessionValidator::new()),
            session_cookie_name: "auth_session".to_string(),
        };
        create_router(state, &ServerConfig::default())
    }

    #[tokio::test]
    async fn health_is_public_and_tagged_with_request_id() {
        let response = app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn incoming_request_id_is_echoed() {
        let response = app()
            .oneshot(
                Request::get("/api/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn health_ignores_a_stale_session_cookie() {
        let response = app()
            .oneshot(
                Request::get("/api/health")
                    .header(header::COOKIE, "auth_session=expired-long-ago")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn conversation_routes_require_a_session() {
        let response = app()
            .oneshot(Request::get("/api/conversations").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn cors_layer_skips_invalid_origins() {
        let _layer = cors_layer(&["https://chat.example.com".to_string(), "bad\norigin".to_string()]);
        let _empty = cors_layer(&[]);
    }
}
