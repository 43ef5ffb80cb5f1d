//! Core domain types and utilities for the deferral engine.
//!
//! This crate provides the identifiers and error-handling foundation shared
//! by the conversation, model gateway and execution crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ConversationId, MessageId, ParseIdError, TurnId};
