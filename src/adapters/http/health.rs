//! Liveness endpoint. Public; does not touch the database or the provider.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::Environment;

/// State for the health route.
#[derive(Debug, Clone, Copy)]
pub struct HealthState {
    pub environment: Environment,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
    pub env: String,
    /// Server wall-clock time, `DD/MM/YYYY HH:MM:SS` in UTC.
    pub time: String,
}

/// GET /api/health
pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "OK".to_string(),
        env: state.environment.as_str().to_string(),
        time: Utc::now().format("%d/%m/%Y %H:%M:%S").to_string(),
    })
}

/// - GET /health
pub fn health_routes() -> Router<HealthState> {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_environment_and_time() {
        let Json(body) = health(State(HealthState {
            environment: Environment::Staging,
        }))
        .await;

        assert_eq!(body.message, "OK");
        assert_eq!(body.env, "staging");
        assert_eq!(body.time.len(), "05/03/2024 08:00:00".len());
    }
}
