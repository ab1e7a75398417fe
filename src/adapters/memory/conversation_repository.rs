//! In-memory implementation of ConversationRepository.
//!
//! Thread-safe via an internal `Mutex`. Applies the same owner and
//! soft-delete scoping as the PostgreSQL adapter. Data is lost on restart.
//!
//! Faults can be armed to make a chosen operation fail once, which lets tests
//! drive the relay through its persistence failure paths.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::domain::conversation::{Conversation, Message, Sender};
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, UserId};
use crate::ports::{ConversationRepository, ConversationUpdate};

/// An operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryFault {
    CreateConversation,
    AddMessage(Sender),
    Update,
}

#[derive(Debug, Default)]
struct State {
    conversations: HashMap<ConversationId, Conversation>,
    faults: HashSet<RepositoryFault>,
}

/// In-memory implementation of the ConversationRepository port.
#[derive(Debug, Default)]
pub struct InMemoryConversationRepository {
    state: Mutex<State>,
}

impl InMemoryConversationRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next matching operation fail with a database error.
    pub fn fail_next(&self, fault: RepositoryFault) {
        if let Ok(mut state) = self.state.lock() {
            state.faults.insert(fault);
        }
    }

    /// Stores a conversation as-is, bypassing scoping. For seeding tests.
    pub fn insert(&self, conversation: Conversation) {
        if let Ok(mut state) = self.state.lock() {
            state.conversations.insert(conversation.id(), conversation);
        }
    }

    /// Returns a stored conversation regardless of owner or deletion.
    pub fn get(&self, id: &ConversationId) -> Option<Conversation> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.conversations.get(id).cloned())
    }

    /// Total number of stored messages across all conversations.
    pub fn message_count(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.conversations.values().map(|c| c.messages().len()).sum())
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "Repository lock poisoned"))
    }
}

impl State {
    fn trip(&mut self, fault: RepositoryFault) -> Result<(), DomainError> {
        if self.faults.remove(&fault) {
            return Err(DomainError::database(format!("Injected fault: {:?}", fault)));
        }
        Ok(())
    }

    fn visible_mut(
        &mut self,
        id: &ConversationId,
        owner: &UserId,
    ) -> Result<&mut Conversation, DomainError> {
        self.conversations
            .get_mut(id)
            .filter(|c| c.is_visible_to(owner))
            .ok_or_else(DomainError::conversation_not_found)
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn create(&self, owner: &UserId, title: &str) -> Result<Conversation, DomainError> {
        let mut state = self.lock()?;
        state.trip(RepositoryFault::CreateConversation)?;

        let mut conversation = Conversation::new(owner.clone());
        conversation.rename(title)?;
        state
            .conversations
            .insert(conversation.id(), conversation.clone());
        Ok(conversation)
    }

    async fn find_owned(
        &self,
        id: &ConversationId,
        owner: &UserId,
    ) -> Result<Option<Conversation>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .conversations
            .get(id)
            .filter(|c| c.is_visible_to(owner))
            .cloned())
    }

    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Conversation>, DomainError> {
        let state = self.lock()?;
        let mut list: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| c.is_visible_to(owner))
            .map(Conversation::summary)
            .collect();
        list.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        Ok(list)
    }

    async fn add_message(
        &self,
        conversation_id: &ConversationId,
        sender: Sender,
        content: &str,
    ) -> Result<Message, DomainError> {
        let mut state = self.lock()?;
        state.trip(RepositoryFault::AddMessage(sender))?;

        let conversation = state
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(DomainError::conversation_not_found)?;
        let message = Message::new(*conversation_id, sender, content);
        conversation.record_message(message.clone());
        Ok(message)
    }

    async fn update(
        &self,
        id: &ConversationId,
        owner: &UserId,
        update: ConversationUpdate,
    ) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        state.trip(RepositoryFault::Update)?;

        let conversation = state.visible_mut(id, owner)?;
        if let Some(title) = update.title {
            conversation.rename(&title)?;
        }
        if let Some(at) = update.updated_at {
            conversation.touch(at);
        }
        Ok(())
    }

    async fn soft_delete(&self, id: &ConversationId, owner: &UserId) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        let conversation = state.visible_mut(id, owner)?;
        conversation.soft_delete(crate::domain::foundation::Timestamp::now());
        Ok(())
    }
}
