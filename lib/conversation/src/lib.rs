//! Conversation-side data for the deferral engine.
//!
//! This crate provides:
//!
//! - **Messages**: Ordered conversation history, including the function calls
//!   a model requested and the results fed back to it
//! - **Handlers**: The kinds of external interaction a suspended function waits on
//! - **Memory**: The conversation history collaborator
//! - **Suspension Store**: The single outstanding suspended call per conversation

pub mod error;
pub mod function;
pub mod handler;
pub mod memory;
pub mod message;
pub mod state;
pub mod suspension;

pub use error::{MemoryError, StateDecodeError, SuspensionError};
pub use function::FunctionDeclaration;
pub use handler::{Handler, HandlerKind};
pub use memory::{ConversationMemory, InMemoryConversationMemory};
pub use message::{FunctionCall, FunctionResult, Message, MessageRole};
pub use state::ConversationState;
pub use suspension::{
    DeferredResult, DeferredState, InMemorySuspensionStore, SuspendedCallRecord, SuspensionStore,
};
