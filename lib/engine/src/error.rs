//! Error types for the engine crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `RegistryError`: Registration and lookup of functions
//! - `ValidationError`: Arguments that violate a function's schema
//! - `FunctionError`: Failures reported by function implementations
//! - `CallStateError`: Illegal call status changes
//! - `TurnError`: Everything that can end a turn (wraps collaborator errors)

use crate::execution::CallStatus;
use deferral_ai::ModelGatewayError;
use deferral_conversation::{MemoryError, StateDecodeError, SuspensionError};
use deferral_core::ConversationId;
use std::fmt;

/// Errors from the function registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A function with this name is already registered.
    DuplicateName { name: String },
    /// No function with this name is registered.
    UnknownFunction { name: String },
    /// The parameter schema does not compile.
    InvalidSchema { name: String, reason: String },
    /// Only ordinary functions can be put behind an approval gate.
    NotWrappable { name: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName { name } => {
                write!(f, "function '{name}' is already registered")
            }
            Self::UnknownFunction { name } => write!(f, "unknown function: {name}"),
            Self::InvalidSchema { name, reason } => {
                write!(f, "invalid parameter schema for '{name}': {reason}")
            }
            Self::NotWrappable { name } => {
                write!(f, "function '{name}' is already suspendable and cannot require approval")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Arguments that do not satisfy a function's parameter schema.
///
/// Recovered within the turn: the model sees it as a function failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The function that was called.
    pub function: String,
    /// One entry per schema violation.
    pub violations: Vec<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid arguments for '{}': {}",
            self.function,
            self.violations.join("; ")
        )
    }
}

impl std::error::Error for ValidationError {}

/// Errors returned by function implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionError {
    /// The function ran and failed. Reported back to the model.
    Failed { reason: String },
    /// The state handed to `resume` cannot be interpreted.
    CorruptedState { reason: String },
    /// The inbound input is not something this suspension can consume.
    InputMismatch { reason: String },
}

impl FunctionError {
    /// Creates a `Failed` error.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Creates an `InputMismatch` error.
    #[must_use]
    pub fn input_mismatch(reason: impl Into<String>) -> Self {
        Self::InputMismatch {
            reason: reason.into(),
        }
    }

    /// Returns the reason text.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Failed { reason }
            | Self::CorruptedState { reason }
            | Self::InputMismatch { reason } => reason,
        }
    }
}

impl fmt::Display for FunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "function failed: {reason}"),
            Self::CorruptedState { reason } => write!(f, "corrupted resume state: {reason}"),
            Self::InputMismatch { reason } => write!(f, "input does not match suspension: {reason}"),
        }
    }
}

impl std::error::Error for FunctionError {}

impl From<StateDecodeError> for FunctionError {
    fn from(e: StateDecodeError) -> Self {
        Self::CorruptedState { reason: e.reason }
    }
}

/// An illegal change of a call's status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStateError {
    /// The call cannot move from `from` to `to`.
    InvalidTransition {
        call_id: String,
        from: CallStatus,
        to: CallStatus,
    },
}

impl fmt::Display for CallStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { call_id, from, to } => {
                write!(f, "call {call_id} cannot move from {from} to {to}")
            }
        }
    }
}

impl std::error::Error for CallStateError {}

/// Errors that end a turn.
///
/// Suspensions are not errors; see
/// [`TurnOutcome::Suspended`](crate::coordinator::TurnOutcome::Suspended).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// The model called, or a record names, a function that is not registered.
    UnknownFunction { name: String },
    /// The outstanding suspension cannot be read or interpreted.
    ///
    /// The record is left in place for inspection.
    SuspensionStateCorrupted {
        conversation_id: ConversationId,
        reason: String,
    },
    /// The suspended function rejected the inbound input.
    ///
    /// Only raised outside
    /// [`ResumePolicy::TryResumeThenFallback`](crate::router::ResumePolicy::TryResumeThenFallback),
    /// which handles the input as a fresh turn instead. The record is left
    /// in place, so a later matching input still resumes the call.
    ResumeMismatch { function: String, reason: String },
    /// The turn needed more model calls than allowed.
    MaxRecursionExceeded { max_depth: u32 },
    /// The model gateway failed.
    ModelGateway(ModelGatewayError),
    /// Conversation memory failed.
    Memory(MemoryError),
    /// The suspension store failed.
    Suspension(SuspensionError),
    /// A call moved through an illegal status change.
    CallState(CallStateError),
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFunction { name } => write!(f, "unknown function: {name}"),
            Self::SuspensionStateCorrupted {
                conversation_id,
                reason,
            } => {
                write!(
                    f,
                    "suspension state corrupted for conversation {conversation_id}: {reason}"
                )
            }
            Self::ResumeMismatch { function, reason } => {
                write!(f, "input does not resume '{function}': {reason}")
            }
            Self::MaxRecursionExceeded { max_depth } => {
                write!(f, "turn exceeded the maximum of {max_depth} model calls")
            }
            Self::ModelGateway(e) => write!(f, "model gateway error: {e}"),
            Self::Memory(e) => write!(f, "memory error: {e}"),
            Self::Suspension(e) => write!(f, "suspension store error: {e}"),
            Self::CallState(e) => write!(f, "call state error: {e}"),
        }
    }
}

impl std::error::Error for TurnError {}

impl From<ModelGatewayError> for TurnError {
    fn from(e: ModelGatewayError) -> Self {
        Self::ModelGateway(e)
    }
}

impl From<MemoryError> for TurnError {
    fn from(e: MemoryError) -> Self {
        Self::Memory(e)
    }
}

impl From<SuspensionError> for TurnError {
    fn from(e: SuspensionError) -> Self {
        match e {
            SuspensionError::CorruptedRecord {
                conversation_id,
                reason,
            } => Self::SuspensionStateCorrupted {
                conversation_id,
                reason,
            },
            other => Self::Suspension(other),
        }
    }
}

impl From<CallStateError> for TurnError {
    fn from(e: CallStateError) -> Self {
        Self::CallState(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_violations() {
        let err = ValidationError {
            function: "expense_approval".to_string(),
            violations: vec![
                "\"lots\" is not of type \"number\"".to_string(),
                "\"doc\" is a required property".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "invalid arguments for 'expense_approval': \"lots\" is not of type \"number\"; \"doc\" is a required property"
        );
    }

    #[test]
    fn corrupted_record_becomes_corrupted_state() {
        let conversation_id = ConversationId::new();
        let err = TurnError::from(SuspensionError::CorruptedRecord {
            conversation_id,
            reason: "EOF".to_string(),
        });
        assert_eq!(
            err,
            TurnError::SuspensionStateCorrupted {
                conversation_id,
                reason: "EOF".to_string(),
            }
        );
    }

    #[test]
    fn decode_failure_is_corrupted_state() {
        let err = FunctionError::from(StateDecodeError {
            reason: "missing field `stage`".to_string(),
        });
        assert!(matches!(err, FunctionError::CorruptedState { .. }));
        assert_eq!(err.reason(), "missing field `stage`");
    }

    #[test]
    fn invalid_transition_display() {
        let err = CallStateError::InvalidTransition {
            call_id: "call_1".to_string(),
            from: CallStatus::Completed,
            to: CallStatus::Running,
        };
        assert_eq!(err.to_string(), "call call_1 cannot move from completed to running");
    }
}
