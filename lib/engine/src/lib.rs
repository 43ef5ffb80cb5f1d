//! Suspendable function execution for model-driven conversations.
//!
//! This crate provides:
//!
//! - **Function Registry**: Declared functions, their argument schemas and
//!   implementations, both ordinary and suspendable
//! - **Handler Dispatch**: Which inbound channel resumes which kind of suspension
//! - **Resume Router**: Whether an inbound event resumes a suspended call or
//!   starts a fresh turn
//! - **Execution Coordinator**: The bounded model/function loop that drives a
//!   turn to a final answer or a suspension
//!
//! A suspended call is never a live task. The coordinator persists a
//! [`SuspendedCallRecord`](deferral_conversation::SuspendedCallRecord) and
//! returns; a later turn on the same conversation re-enters the function
//! through [`SuspendableFunction::resume`].

pub mod approval;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod function;
pub mod inbound;
pub mod registry;
pub mod router;
pub mod schema;

pub use approval::{ApprovalDecision, require_approval};
pub use config::EngineConfig;
pub use coordinator::{ExecutionCoordinator, TurnOutcome};
pub use dispatch::{ListenerRegistration, expected_channel};
pub use error::{CallStateError, FunctionError, RegistryError, TurnError, ValidationError};
pub use execution::{CallExecution, CallStatus};
pub use function::{
    FunctionDescriptor, FunctionImpl, FunctionKind, FunctionOutcome, SuspendableFunction,
    SyncFn, SyncFunction,
};
pub use inbound::{InboundChannel, InboundEvent};
pub use registry::{FunctionRegistry, RegisteredFunction};
pub use router::{
    ContentClassifier, FreshReason, KeywordClassifier, ResumePolicy, ResumeRouter, RouteDecision,
};
pub use schema::ArgumentSchema;
