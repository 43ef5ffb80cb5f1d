//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `MemoryError`: Errors from the conversation history collaborator
//! - `SuspensionError`: Errors from suspension store operations
//! - `StateDecodeError`: A deferred state blob did not match the shape its
//!   function expected on resume

use deferral_core::ConversationId;
use std::fmt;

/// Errors from conversation memory operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// Storage operation failed.
    StorageFailed { reason: String },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageFailed { reason } => {
                write!(f, "conversation memory storage failed: {reason}")
            }
        }
    }
}

impl std::error::Error for MemoryError {}

/// Errors from suspension store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuspensionError {
    /// Storage operation failed.
    StorageFailed { reason: String },
    /// The persisted record could not be read back.
    CorruptedRecord {
        conversation_id: ConversationId,
        reason: String,
    },
}

impl fmt::Display for SuspensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageFailed { reason } => {
                write!(f, "suspension storage failed: {reason}")
            }
            Self::CorruptedRecord {
                conversation_id,
                reason,
            } => {
                write!(
                    f,
                    "suspended call record for {conversation_id} is corrupted: {reason}"
                )
            }
        }
    }
}

impl std::error::Error for SuspensionError {}

/// A deferred state blob could not be decoded into the expected type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDecodeError {
    /// Why decoding failed.
    pub reason: String,
}

impl fmt::Display for StateDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to decode deferred state: {}", self.reason)
    }
}

impl std::error::Error for StateDecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_error_display() {
        let err = MemoryError::StorageFailed {
            reason: "lock poisoned".to_string(),
        };
        assert!(err.to_string().contains("lock poisoned"));
    }

    #[test]
    fn suspension_error_display() {
        let conversation_id = ConversationId::new();
        let err = SuspensionError::CorruptedRecord {
            conversation_id,
            reason: "missing field `handler`".to_string(),
        };
        assert!(err.to_string().contains(&conversation_id.to_string()));
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn state_decode_error_display() {
        let err = StateDecodeError {
            reason: "invalid type".to_string(),
        };
        assert_eq!(err.to_string(), "failed to decode deferred state: invalid type");
    }
}
