//! Shared wiring for HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use axum::Router;

use chat_relay::adapters::ai::MockAIProvider;
use chat_relay::adapters::auth::MockSessionValidator;
use chat_relay::adapters::http::conversation::decode_events;
use chat_relay::adapters::http::{create_router, AppState};
use chat_relay::adapters::memory::InMemoryConversationRepository;
use chat_relay::application::{RelayEvent, StreamMessageHandler};
use chat_relay::config::ServerConfig;
use chat_relay::domain::foundation::UserId;

pub const ALICE_SESSION: &str = "sess-alice";
pub const BOB_SESSION: &str = "sess-bob";

pub struct TestApp {
    pub router: Router,
    pub repository: Arc<InMemoryConversationRepository>,
    pub ai: MockAIProvider,
}

impl TestApp {
    pub fn new(ai: MockAIProvider) -> Self {
        let repository = Arc::new(InMemoryConversationRepository::new());
        let validator = MockSessionValidator::new()
            .with_test_user(ALICE_SESSION, "alice")
            .with_test_user(BOB_SESSION, "bob");

        let state = AppState {
            relay: StreamMessageHandler::new(repository.clone(), Arc::new(ai.clone())),
            repository: repository.clone(),
            session_validator: Arc::new(validator),
            session_cookie_name: "auth_session".to_string(),
        };

        Self {
            router: create_router(state, &ServerConfig::default()),
            repository,
            ai,
        }
    }
}

pub fn alice() -> UserId {
    UserId::new("alice").unwrap()
}

pub fn bob() -> UserId {
    UserId::new("bob").unwrap()
}

pub fn cookie(session: &str) -> String {
    format!("auth_session={}", session)
}

/// POST /api/completion with a form body.
pub fn completion_request(session: Option<&str>, id: Option<String>, content: &str) -> Request<Body> {
    let mut body = format!("content={}", content);
    if let Some(id) = id {
        body = format!("id={}&{}", id, body);
    }

    let mut builder = Request::post("/api/completion")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(session) = session {
        builder = builder.header(header::COOKIE, cookie(session));
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn authed(method: &str, uri: &str, session: &str, json: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie(session));
    match json {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

pub async fn relay_events(response: Response<Body>) -> Vec<RelayEvent> {
    decode_events(&body_text(response).await).unwrap()
}

pub fn event_names(events: &[RelayEvent]) -> Vec<&'static str> {
    events.iter().map(RelayEvent::name).collect()
}
