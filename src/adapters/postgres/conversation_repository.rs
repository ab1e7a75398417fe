//! PostgreSQL implementation of ConversationRepository.
//!
//! Every statement that touches a conversation row filters on
//! `id`, `user_id` and `deleted_at IS NULL`, so a stranger's or a deleted
//! conversation behaves exactly like a missing one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::conversation::{Conversation, Message, Sender};
use crate::domain::foundation::{ConversationId, DomainError, MessageId, Timestamp, UserId};
use crate::ports::{ConversationRepository, ConversationUpdate};

/// PostgreSQL implementation of ConversationRepository.
#[derive(Clone)]
pub struct PostgresConversationRepository {
    pool: PgPool,
}

impl PostgresConversationRepository {
    /// Creates a new PostgresConversationRepository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_messages(&self, id: &ConversationId) -> Result<Vec<Message>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, conversation_id, sender, content, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch messages", e))?;

        rows.iter().map(row_to_message).collect()
    }
}

#[async_trait]
impl ConversationRepository for PostgresConversationRepository {
    async fn create(&self, owner: &UserId, title: &str) -> Result<Conversation, DomainError> {
        let mut conversation = Conversation::new(owner.clone());
        conversation
            .rename(title)
            .map_err(DomainError::from)?;

        sqlx::query(
            r#"
            INSERT INTO conversations (id, user_id, title, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(conversation.id().as_uuid())
        .bind(owner.as_str())
        .bind(conversation.title())
        .bind(conversation.created_at().as_datetime())
        .bind(conversation.updated_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert conversation", e))?;

        Ok(conversation)
    }

    async fn find_owned(
        &self,
        id: &ConversationId,
        owner: &UserId,
    ) -> Result<Option<Conversation>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, title, created_at, updated_at, deleted_at
            FROM conversations
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(owner.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch conversation", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let messages = self.load_messages(id).await?;
        row_to_conversation(&row, messages).map(Some)
    }

    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Conversation>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, created_at, updated_at, deleted_at
            FROM conversations
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY updated_at DESC
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list conversations", e))?;

        rows.iter()
            .map(|row| row_to_conversation(row, Vec::new()))
            .collect()
    }

    async fn add_message(
        &self,
        conversation_id: &ConversationId,
        sender: Sender,
        content: &str,
    ) -> Result<Message, DomainError> {
        let message = Message::new(*conversation_id, sender, content);

        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, sender, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(message.id().as_uuid())
        .bind(conversation_id.as_uuid())
        .bind(sender.as_str())
        .bind(message.content())
        .bind(message.created_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_foreign_key_violation() {
                    return DomainError::conversation_not_found();
                }
            }
            db_error("Failed to insert message", e)
        })?;

        Ok(message)
    }

    async fn update(
        &self,
        id: &ConversationId,
        owner: &UserId,
        update: ConversationUpdate,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE conversations SET
                title = COALESCE($3, title),
                updated_at = COALESCE($4, updated_at)
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(owner.as_str())
        .bind(update.title)
        .bind(update.updated_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update conversation", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::conversation_not_found());
        }
        Ok(())
    }

    async fn soft_delete(&self, id: &ConversationId, owner: &UserId) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE conversations SET deleted_at = $3
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(owner.as_str())
        .bind(Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to delete conversation", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::conversation_not_found());
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Row mapping
// ════════════════════════════════════════════════════════════════════════════

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, e))
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| db_error(&format!("Failed to read column '{}'", name), e))
}

fn row_to_conversation(row: &PgRow, messages: Vec<Message>) -> Result<Conversation, DomainError> {
    let id: Uuid = column(row, "id")?;
    let user_id: String = column(row, "user_id")?;
    let title: String = column(row, "title")?;
    let created_at: DateTime<Utc> = column(row, "created_at")?;
    let updated_at: DateTime<Utc> = column(row, "updated_at")?;
    let deleted_at: Option<DateTime<Utc>> = column(row, "deleted_at")?;

    Ok(Conversation::reconstitute(
        ConversationId::from_uuid(id),
        UserId::new(user_id)?,
        title,
        messages,
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(updated_at),
        deleted_at.map(Timestamp::from_datetime),
    ))
}

fn row_to_message(row: &PgRow) -> Result<Message, DomainError> {
    let id: Uuid = column(row, "id")?;
    let conversation_id: Uuid = column(row, "conversation_id")?;
    let sender: String = column(row, "sender")?;
    let content: String = column(row, "content")?;
    let created_at: DateTime<Utc> = column(row, "created_at")?;

    Ok(Message::reconstitute(
        MessageId::from_uuid(id),
        ConversationId::from_uuid(conversation_id),
        sender.parse::<Sender>()?,
        content,
        Timestamp::from_datetime(created_at),
    ))
}
