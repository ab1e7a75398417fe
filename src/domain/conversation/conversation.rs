//! Conversation entity - an owner-scoped thread of messages.

use super::Message;
use crate::domain::foundation::{ConversationId, Timestamp, UserId, ValidationError};

/// Title given to a conversation before one has been generated.
pub const PLACEHOLDER_TITLE: &str = "New chat";

/// Longest title accepted from a rename or from title generation.
pub const MAX_TITLE_LENGTH: usize = 100;

/// Conversation entity.
///
/// # Invariants
///
/// - Only `owner` may see or change the conversation, and only while
///   `deleted_at` is `None`.
/// - `messages` are kept in creation order.
/// - Deletion is soft: the row stays, `deleted_at` is set once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    id: ConversationId,
    owner: UserId,
    title: String,
    messages: Vec<Message>,
    created_at: Timestamp,
    updated_at: Timestamp,
    deleted_at: Option<Timestamp>,
}

impl Conversation {
    /// Creates an empty conversation carrying the placeholder title.
    pub fn new(owner: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            id: ConversationId::new(),
            owner,
            title: PLACEHOLDER_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Reconstitutes a conversation from persistence.
    pub fn reconstitute(
        id: ConversationId,
        owner: UserId,
        title: String,
        messages: Vec<Message>,
        created_at: Timestamp,
        updated_at: Timestamp,
        deleted_at: Option<Timestamp>,
    ) -> Self {
        Self {
            id,
            owner,
            title,
            messages,
            created_at,
            updated_at,
            deleted_at,
        }
    }

    // === Accessors ===

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn deleted_at(&self) -> Option<Timestamp> {
        self.deleted_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// True when `user` owns the conversation and it has not been deleted.
    pub fn is_visible_to(&self, user: &UserId) -> bool {
        &self.owner == user && !self.is_deleted()
    }

    // === Mutations ===

    /// Appends a message, keeping creation order.
    pub fn record_message(&mut self, message: Message) {
        let position = self
            .messages
            .iter()
            .rposition(|m| m.created_at() <= message.created_at())
            .map(|i| i + 1)
            .unwrap_or(0);
        self.messages.insert(position, message);
    }

    /// Replaces the title after validating it.
    pub fn rename(&mut self, title: &str) -> Result<(), ValidationError> {
        self.title = validate_title(title)?;
        Ok(())
    }

    /// Sets the last-updated marker.
    pub fn touch(&mut self, at: Timestamp) {
        self.updated_at = at;
    }

    /// Marks the conversation deleted. Repeated calls keep the first marker.
    pub fn soft_delete(&mut self, at: Timestamp) {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(at);
        }
    }

    /// Copy of this conversation with the message list dropped.
    pub fn summary(&self) -> Self {
        Self {
            id: self.id,
            owner: self.owner.clone(),
            title: self.title.clone(),
            messages: Vec::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}

/// Trims a user-supplied title and checks it is non-empty and short enough.
pub fn validate_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty_field("title"));
    }
    let length = trimmed.chars().count();
    if length > MAX_TITLE_LENGTH {
        return Err(ValidationError::too_long("title", MAX_TITLE_LENGTH, length));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::Sender;
    use chrono::{Duration, Utc};

    fn owner() -> UserId {
        UserId::new("owner-1").unwrap()
    }

    fn at(offset_secs: i64) -> Timestamp {
        Timestamp::from_datetime(Utc::now() + Duration::seconds(offset_secs))
    }

    #[test]
    fn new_conversation_has_placeholder_title_and_no_messages() {
        let conv = Conversation::new(owner());

        assert_eq!(conv.title(), PLACEHOLDER_TITLE);
        assert_eq!(conv.title(), PLACEHOLDER_TITLE);
        assert!(conv.messages().is_empty());
        assert!(!conv.is_deleted());
    }

    #[test]
    fn visibility_requires_owner_and_not_deleted() {
        let mut conv = Conversation::new(owner());
        let stranger = UserId::new("someone-else").unwrap();

        assert!(conv.is_visible_to(&owner()));
        assert!(!conv.is_visible_to(&stranger));

        conv.soft_delete(Timestamp::now());
        assert!(!conv.is_visible_to(&owner()));
    }

    #[test]
    fn soft_delete_keeps_first_marker() {
        let mut conv = Conversation::new(owner());
        let first = at(0);
        conv.soft_delete(first);
        conv.soft_delete(at(60));

        assert_eq!(conv.deleted_at(), Some(first));
    }

    #[test]
    fn record_message_orders_by_creation_time() {
        let mut conv = Conversation::new(owner());
        let id = conv.id();
        let late = Message::reconstitute(
            crate::domain::foundation::MessageId::new(),
            id,
            Sender::Assistant,
            "second".into(),
            at(10),
        );
        let early = Message::reconstitute(
            crate::domain::foundation::MessageId::new(),
            id,
            Sender::User,
            "first".into(),
            at(0),
        );

        conv.record_message(late);
        conv.record_message(early);

        let contents: Vec<_> = conv.messages().iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[test]
    fn rename_trims_and_rejects_blank() {
        let mut conv = Conversation::new(owner());

        conv.rename("  Trip planning  ").unwrap();
        assert_eq!(conv.title(), "Trip planning");

        assert!(conv.rename("   ").is_err());
        assert_eq!(conv.title(), "Trip planning");
    }

    #[test]
    fn validate_title_rejects_overlong() {
        let long = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert_eq!(
            validate_title(&long),
            Err(ValidationError::too_long("title", MAX_TITLE_LENGTH, MAX_TITLE_LENGTH + 1))
        );
    }

    #[test]
    fn summary_drops_messages() {
        let mut conv = Conversation::new(owner());
        conv.record_message(Message::new(conv.id(), Sender::User, "hi"));

        let summary = conv.summary();
        assert!(summary.messages().is_empty());
        assert_eq!(summary.id(), conv.id());
    }
}
