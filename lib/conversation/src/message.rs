//! Message types for conversations.

use chrono::{DateTime, Utc};
use deferral_core::MessageId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Prefix the model sees when a function could not produce a result.
pub const FUNCTION_FAILURE_PREFIX: &str = "Function execution failed: ";

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User/human message.
    User,
    /// Model message, possibly carrying function calls.
    Assistant,
    /// Function result message.
    Function,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Message role.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
    /// Function calls requested by the model (assistant messages only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_calls: Vec<FunctionCall>,
    /// Function result (function messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_result: Option<FunctionResult>,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            function_calls: Vec::new(),
            function_result: None,
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Creates a function result message.
    #[must_use]
    pub fn function_result(result: FunctionResult) -> Self {
        let mut msg = Self::new(MessageRole::Function, result.content.clone());
        msg.function_result = Some(result);
        msg
    }

    /// Adds a function call.
    #[must_use]
    pub fn with_function_call(mut self, call: FunctionCall) -> Self {
        self.function_calls.push(call);
        self
    }

    /// Replaces the function calls.
    #[must_use]
    pub fn with_function_calls(mut self, calls: Vec<FunctionCall>) -> Self {
        self.function_calls = calls;
        self
    }

    /// Returns true if this message has function calls.
    #[must_use]
    pub fn has_function_calls(&self) -> bool {
        !self.function_calls.is_empty()
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Identifier assigned by the model; results refer back to it.
    pub id: String,
    /// The function name.
    pub name: String,
    /// Arguments for the function.
    pub arguments: JsonValue,
}

impl FunctionCall {
    /// Creates a new function call.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Result of a function invocation, fed back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionResult {
    /// The function call ID this result is for.
    pub call_id: String,
    /// Model-visible content.
    pub content: String,
    /// Whether the invocation failed.
    #[serde(default)]
    pub is_failure: bool,
}

impl FunctionResult {
    /// Creates a successful function result.
    #[must_use]
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_failure: false,
        }
    }

    /// Creates a failed function result.
    ///
    /// The content is prefixed with [`FUNCTION_FAILURE_PREFIX`] so the model
    /// can tell failures from ordinary output.
    #[must_use]
    pub fn failure(call_id: impl Into<String>, reason: impl AsRef<str>) -> Self {
        Self {
            call_id: call_id.into(),
            content: format!("{FUNCTION_FAILURE_PREFIX}{}", reason.as_ref()),
            is_failure: true,
        }
    }

    /// Returns true if the function call succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.is_failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_creation() {
        let msg = Message::user("Hello!");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, "Hello!");
        assert!(!msg.has_function_calls());
    }

    #[test]
    fn message_with_function_calls() {
        let call = FunctionCall::new("call_1", "lookup", serde_json::json!({"query": "weather"}));
        let msg = Message::assistant("").with_function_call(call);

        assert!(msg.has_function_calls());
        assert_eq!(msg.function_calls[0].name, "lookup");
    }

    #[test]
    fn function_result_message_mirrors_content() {
        let msg = Message::function_result(FunctionResult::success("call_1", "42"));

        assert_eq!(msg.role, MessageRole::Function);
        assert_eq!(msg.content, "42");
        assert_eq!(msg.function_result.as_ref().map(|r| r.call_id.as_str()), Some("call_1"));
    }

    #[test]
    fn function_failure_is_prefixed() {
        let result = FunctionResult::failure("call_1", "timeout");
        assert!(!result.is_success());
        assert_eq!(result.content, "Function execution failed: timeout");
    }

    #[test]
    fn message_serde_roundtrip() {
        let msg = Message::assistant("Checking.")
            .with_function_call(FunctionCall::new("call_1", "calc", serde_json::json!({})));

        let json = serde_json::to_string(&msg).expect("serialize");
        let parsed: Message = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(msg, parsed);
    }
}
