//! Point-in-time view of a conversation.

use crate::message::Message;
use crate::suspension::SuspendedCallRecord;
use deferral_core::ConversationId;
use serde::{Deserialize, Serialize};

/// A conversation's history plus its outstanding suspension, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// The conversation.
    pub conversation_id: ConversationId,
    /// Messages, oldest first.
    pub history: Vec<Message>,
    /// The single outstanding suspended call.
    pub suspension: Option<SuspendedCallRecord>,
}

impl ConversationState {
    /// Returns true if a suspended call is waiting for input.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspension.is_some()
    }

    /// Returns the last message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::suspension::{DeferredResult, DeferredState};

    #[test]
    fn suspended_state() {
        let conversation_id = ConversationId::new();
        let state = ConversationState {
            conversation_id,
            history: vec![Message::user("Book it")],
            suspension: Some(SuspendedCallRecord::new(
                conversation_id,
                "book",
                "call_1",
                DeferredResult::new(DeferredState::new(), Handler::ask_user("Which day?")),
            )),
        };

        assert!(state.is_suspended());
        assert_eq!(state.last_message().map(|m| m.content.as_str()), Some("Book it"));
    }
}
