//! Model gateway abstraction.
//!
//! Provides the single operation the engine needs from a language model:
//! `generate(history, functions)`, answered either with a terminal message
//! or with the function calls the model wants made.

use crate::error::ModelGatewayError;
use async_trait::async_trait;
use deferral_conversation::{FunctionCall, FunctionDeclaration, Message};
use serde::{Deserialize, Serialize};

/// A request to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// System instructions, if any.
    pub system: Option<String>,
    /// Conversation history, oldest first.
    pub history: Vec<Message>,
    /// Functions the model may call.
    pub functions: Vec<FunctionDeclaration>,
}

impl GenerateRequest {
    /// Creates a request over the given history.
    #[must_use]
    pub fn new(history: Vec<Message>) -> Self {
        Self {
            system: None,
            history,
            functions: Vec::new(),
        }
    }

    /// Adds system instructions.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Sets the callable functions.
    #[must_use]
    pub fn with_functions(mut self, functions: Vec<FunctionDeclaration>) -> Self {
        self.functions = functions;
        self
    }

    /// Returns the most recent message in the history.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }
}

/// What the model answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelReply {
    /// A final answer with no function calls.
    Terminal { content: String },
    /// The model wants these functions called, in order.
    FunctionCalls {
        /// Any text the model emitted alongside the calls.
        #[serde(default)]
        content: String,
        calls: Vec<FunctionCall>,
    },
}

impl ModelReply {
    /// Creates a terminal reply.
    #[must_use]
    pub fn terminal(content: impl Into<String>) -> Self {
        Self::Terminal {
            content: content.into(),
        }
    }

    /// Creates a reply requesting function calls.
    ///
    /// An empty call list is a terminal reply.
    #[must_use]
    pub fn calls(content: impl Into<String>, calls: Vec<FunctionCall>) -> Self {
        let content = content.into();
        if calls.is_empty() {
            Self::Terminal { content }
        } else {
            Self::FunctionCalls { content, calls }
        }
    }

    /// Creates a reply requesting a single function call.
    #[must_use]
    pub fn call(call: FunctionCall) -> Self {
        Self::calls("", vec![call])
    }

    /// Returns the text content.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Terminal { content } | Self::FunctionCalls { content, .. } => content,
        }
    }

    /// Converts the reply into the assistant message recorded in history.
    #[must_use]
    pub fn into_message(self) -> Message {
        match self {
            Self::Terminal { content } => Message::assistant(content),
            Self::FunctionCalls { content, calls } => {
                Message::assistant(content).with_function_calls(calls)
            }
        }
    }
}

/// Trait for model gateways.
///
/// Implementations own the provider protocol, authentication and any retry
/// policy.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Generates the model's next reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the model call fails.
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelReply, ModelGatewayError>;

    /// Returns the model name.
    fn model(&self) -> &str;
}
