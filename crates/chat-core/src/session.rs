//! Chat Sessions
//!
//! A chat session owns an ordered list of messages and remembers which
//! model it was started with.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ChatError, Result};
use crate::message::Message;

/// Title given to chats created from a first prompt
pub const DEFAULT_TITLE: &str = "New Chat";

/// Unique chat identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(Uuid);

impl ChatId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChatId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for ChatId {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ChatError::SessionNotFound(s.to_string()))
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat as listed in the sidebar
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: ChatId,
    pub title: String,
    pub model: String,
}

/// Persistence interface for chats and their messages
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// All chats, oldest first
    async fn list_sessions(&self) -> Result<Vec<ChatSession>>;

    /// Look up a single chat
    async fn get_session(&self, id: &ChatId) -> Result<Option<ChatSession>>;

    /// Create a chat with a caller-chosen id
    async fn create_session(&self, title: &str, id: ChatId, model: &str) -> Result<ChatSession>;

    /// Rename a chat
    async fn update_session_title(&self, id: &ChatId, title: &str) -> Result<()>;

    /// Messages of a chat ordered by creation time
    async fn get_messages(&self, id: &ChatId) -> Result<Vec<Message>>;

    /// Append messages in one batch, order preserved
    async fn create_messages(&self, id: &ChatId, messages: &[Message]) -> Result<()>;
}

#[derive(Default)]
struct MemoryState {
    sessions: Vec<ChatSession>,
    messages: HashMap<ChatId, Vec<Message>>,
}

/// In-memory chat store (for development/testing)
#[derive(Default)]
pub struct MemoryChatStore {
    state: RwLock<MemoryState>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        Ok(self.state.read().await.sessions.clone())
    }

    async fn get_session(&self, id: &ChatId) -> Result<Option<ChatSession>> {
        let state = self.state.read().await;
        Ok(state.sessions.iter().find(|s| &s.id == id).cloned())
    }

    async fn create_session(&self, title: &str, id: ChatId, model: &str) -> Result<ChatSession> {
        let mut state = self.state.write().await;
        if state.sessions.iter().any(|s| s.id == id) {
            return Err(ChatError::Storage(format!("chat {} already exists", id)));
        }
        let session = ChatSession {
            id,
            title: title.to_string(),
            model: model.to_string(),
        };
        state.sessions.push(session.clone());
        state.messages.insert(id, Vec::new());
        Ok(session)
    }

    async fn update_session_title(&self, id: &ChatId, title: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| ChatError::SessionNotFound(id.to_string()))?;
        session.title = title.to_string();
        Ok(())
    }

    async fn get_messages(&self, id: &ChatId) -> Result<Vec<Message>> {
        let state = self.state.read().await;
        let mut messages = state
            .messages
            .get(id)
            .cloned()
            .ok_or_else(|| ChatError::SessionNotFound(id.to_string()))?;
        messages.sort_by_key(|m| m.created);
        Ok(messages)
    }

    async fn create_messages(&self, id: &ChatId, messages: &[Message]) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .messages
            .get_mut(id)
            .ok_or_else(|| ChatError::SessionNotFound(id.to_string()))?
            .extend_from_slice(messages);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryChatStore::new();
        let id = ChatId::new();

        let session = store.create_session(DEFAULT_TITLE, id, "llama3.2").await.unwrap();
        assert_eq!(session.title, "New Chat");

        store.update_session_title(&id, "Trip planning").await.unwrap();
        let loaded = store.get_session(&id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Trip planning");

        store
            .create_messages(&id, &[Message::user("one"), Message::user("two")])
            .await
            .unwrap();
        let messages = store.get_messages(&id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text(), "one");
    }

    #[tokio::test]
    async fn test_unknown_chat() {
        let store = MemoryChatStore::new();
        let result = store.get_messages(&ChatId::new()).await;
        assert!(matches!(result, Err(ChatError::SessionNotFound(_))));
        assert!("not-a-uuid".parse::<ChatId>().is_err());
    }
}
