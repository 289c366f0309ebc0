use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;
use tracing::debug;

/// Client-chosen identifier for a multi-turn conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resumable execution state handed out by the agent service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps conversations to the agent session that continues them.
///
/// Lives for the process only: no eviction, no expiry, nothing on disk.
/// Separate processes each hold their own store.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<ConversationId, SessionId>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, conversation: &ConversationId) -> Option<SessionId> {
        self.sessions.read().await.get(conversation).cloned()
    }

    pub async fn set(&self, conversation: ConversationId, session: SessionId) {
        debug!(%conversation, %session, "recording session for conversation");
        self.sessions.write().await.insert(conversation, session);
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_conversation_has_no_session() {
        let store = SessionStore::new();
        assert_eq!(store.get(&ConversationId::new("C1")).await, None);
    }

    #[tokio::test]
    async fn latest_session_wins() {
        let store = SessionStore::new();
        let conversation = ConversationId::new("C1");

        store.set(conversation.clone(), SessionId::new("S1")).await;
        store.set(conversation.clone(), SessionId::new("S2")).await;
        store
            .set(ConversationId::new("C2"), SessionId::new("other"))
            .await;

        assert_eq!(store.get(&conversation).await, Some(SessionId::new("S2")));
    }
}
