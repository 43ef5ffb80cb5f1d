//! Conversation memory.
//!
//! Memory holds the ordered message history of each conversation. The
//! engine never touches storage directly; it goes through
//! [`ConversationMemory`].

use crate::error::MemoryError;
use crate::message::Message;
use async_trait::async_trait;
use deferral_core::ConversationId;
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for conversation history storage.
#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// Appends messages in order, all or none.
    async fn append_messages(
        &self,
        conversation_id: ConversationId,
        messages: Vec<Message>,
    ) -> Result<(), MemoryError>;

    /// Gets the full history of a conversation, oldest first.
    async fn get_history(&self, conversation_id: ConversationId)
    -> Result<Vec<Message>, MemoryError>;

    /// Appends a single message.
    async fn append_message(
        &self,
        conversation_id: ConversationId,
        message: Message,
    ) -> Result<(), MemoryError> {
        self.append_messages(conversation_id, vec![message]).await
    }
}

/// In-process conversation memory.
#[derive(Debug, Default)]
pub struct InMemoryConversationMemory {
    conversations: RwLock<HashMap<ConversationId, Vec<Message>>>,
}

impl InMemoryConversationMemory {
    /// Creates an empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> MemoryError {
    MemoryError::StorageFailed {
        reason: "conversation memory lock poisoned".to_string(),
    }
}

#[async_trait]
impl ConversationMemory for InMemoryConversationMemory {
    async fn append_messages(
        &self,
        conversation_id: ConversationId,
        messages: Vec<Message>,
    ) -> Result<(), MemoryError> {
        if messages.is_empty() {
            return Ok(());
        }
        self.conversations
            .write()
            .map_err(poisoned)?
            .entry(conversation_id)
            .or_default()
            .extend(messages);
        Ok(())
    }

    async fn get_history(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, MemoryError> {
        Ok(self
            .conversations
            .read()
            .map_err(poisoned)?
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageRole;

    #[tokio::test]
    async fn unknown_conversation_has_empty_history() {
        let memory = InMemoryConversationMemory::new();
        let history = memory.get_history(ConversationId::new()).await.expect("history");
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn messages_keep_their_order() {
        let memory = InMemoryConversationMemory::new();
        let conversation_id = ConversationId::new();

        memory
            .append_message(conversation_id, Message::user("first"))
            .await
            .expect("append");
        memory
            .append_messages(
                conversation_id,
                vec![Message::assistant("second"), Message::user("third")],
            )
            .await
            .expect("append");

        let history = memory.get_history(conversation_id).await.expect("history");
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
        assert_eq!(history[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn conversations_are_isolated() {
        let memory = InMemoryConversationMemory::new();
        let first = ConversationId::new();
        let second = ConversationId::new();

        memory
            .append_message(first, Message::user("hello"))
            .await
            .expect("append");

        assert_eq!(memory.get_history(first).await.expect("history").len(), 1);
        assert!(memory.get_history(second).await.expect("history").is_empty());
    }
}
