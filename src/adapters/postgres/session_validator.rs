//! Session validation against the `sessions` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Resolves session cookies by joining `sessions` to `users`.
#[derive(Clone)]
pub struct PostgresSessionValidator {
    pool: PgPool,
}

impl PostgresSessionValidator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionValidator for PostgresSessionValidator {
    async fn validate(&self, session_id: &str) -> Result<AuthenticatedUser, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT s.expires_at, u.id AS user_id, u.display_name, u.email
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::service_unavailable(e.to_string()))?
        .ok_or(AuthError::InvalidSession)?;

        let read = |e: sqlx::Error| AuthError::service_unavailable(e.to_string());
        let expires_at: DateTime<Utc> = row.try_get("expires_at").map_err(read)?;
        if expires_at <= Utc::now() {
            return Err(AuthError::SessionExpired);
        }

        let user_id: String = row.try_get("user_id").map_err(read)?;
        let display_name: Option<String> = row.try_get("display_name").map_err(read)?;
        let email: Option<String> = row.try_get("email").map_err(read)?;

        let id = UserId::new(user_id).map_err(|_| AuthError::UserNotFound)?;
        Ok(AuthenticatedUser::new(id, display_name, email))
    }
}
