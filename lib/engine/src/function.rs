//! Function implementations and their descriptors.
//!
//! Two kinds of function can be registered:
//!
//! - [`SyncFunction`]: always produces a result when invoked.
//! - [`SuspendableFunction`]: may return a [`DeferredResult`] instead, and
//!   must be able to [`resume`](SuspendableFunction::resume) from the state
//!   it deferred with.
//!
//! Both receive everything they need as arguments; neither sees the engine.

use crate::error::FunctionError;
use crate::inbound::InboundEvent;
use async_trait::async_trait;
use deferral_conversation::function::empty_parameters;
use deferral_conversation::{DeferredResult, DeferredState, FunctionDeclaration, Handler};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// What a suspendable function produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionOutcome {
    /// A final result.
    Completed(String),
    /// The function needs external input before it can finish.
    Deferred(DeferredResult),
}

impl FunctionOutcome {
    /// Creates a completed outcome.
    #[must_use]
    pub fn completed(output: impl Into<String>) -> Self {
        Self::Completed(output.into())
    }

    /// Creates a deferred outcome.
    #[must_use]
    pub fn deferred(state: DeferredState, handler: Handler) -> Self {
        Self::Deferred(DeferredResult::new(state, handler))
    }
}

/// A function that always completes.
#[async_trait]
pub trait SyncFunction: Send + Sync {
    /// Runs the function.
    async fn invoke(&self, arguments: &JsonValue) -> Result<String, FunctionError>;
}

/// A function that may suspend for external input.
#[async_trait]
pub trait SuspendableFunction: Send + Sync {
    /// Starts the function.
    async fn invoke(&self, arguments: &JsonValue) -> Result<FunctionOutcome, FunctionError>;

    /// Continues after a suspension, with the state it deferred with and the
    /// input that arrived.
    ///
    /// Return [`FunctionError::InputMismatch`] when `input` is not something
    /// this suspension can consume, and [`FunctionError::CorruptedState`]
    /// when `state` cannot be interpreted.
    async fn resume(
        &self,
        input: &InboundEvent,
        state: DeferredState,
    ) -> Result<FunctionOutcome, FunctionError>;
}

/// Adapts a plain closure into a [`SyncFunction`].
pub struct SyncFn<F>(F);

impl<F> SyncFn<F>
where
    F: Fn(&JsonValue) -> Result<String, FunctionError> + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> SyncFunction for SyncFn<F>
where
    F: Fn(&JsonValue) -> Result<String, FunctionError> + Send + Sync,
{
    async fn invoke(&self, arguments: &JsonValue) -> Result<String, FunctionError> {
        (self.0)(arguments)
    }
}

/// Whether a function can suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    Sync,
    Suspendable,
}

/// The implementation behind a descriptor.
#[derive(Clone)]
pub enum FunctionImpl {
    Sync(Arc<dyn SyncFunction>),
    Suspendable(Arc<dyn SuspendableFunction>),
}

impl fmt::Debug for FunctionImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("FunctionImpl::Sync(..)"),
            Self::Suspendable(_) => f.write_str("FunctionImpl::Suspendable(..)"),
        }
    }
}

/// A function as registered: declaration plus implementation.
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    /// Unique name.
    pub name: String,
    /// Description shown to the model.
    pub description: String,
    /// JSON schema for the arguments.
    pub parameters: JsonValue,
    /// The implementation.
    pub implementation: FunctionImpl,
}

impl FunctionDescriptor {
    /// Describes an ordinary function. It takes no parameters until
    /// [`with_parameters`](Self::with_parameters) says otherwise.
    #[must_use]
    pub fn sync(
        name: impl Into<String>,
        description: impl Into<String>,
        function: impl SyncFunction + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: empty_parameters(),
            implementation: FunctionImpl::Sync(Arc::new(function)),
        }
    }

    /// Describes a suspendable function.
    #[must_use]
    pub fn suspendable(
        name: impl Into<String>,
        description: impl Into<String>,
        function: impl SuspendableFunction + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: empty_parameters(),
            implementation: FunctionImpl::Suspendable(Arc::new(function)),
        }
    }

    /// Sets the parameter schema.
    #[must_use]
    pub fn with_parameters(mut self, schema: JsonValue) -> Self {
        self.parameters = schema;
        self
    }

    /// Returns the function kind.
    #[must_use]
    pub fn kind(&self) -> FunctionKind {
        match self.implementation {
            FunctionImpl::Sync(_) => FunctionKind::Sync,
            FunctionImpl::Suspendable(_) => FunctionKind::Suspendable,
        }
    }

    /// Returns what the model sees of this function.
    #[must_use]
    pub fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration::new(&self.name, &self.description)
            .with_parameters(self.parameters.clone())
    }

    /// Invokes the function with already validated arguments.
    pub async fn invoke(&self, arguments: &JsonValue) -> Result<FunctionOutcome, FunctionError> {
        match &self.implementation {
            FunctionImpl::Sync(function) => {
                function.invoke(arguments).await.map(FunctionOutcome::Completed)
            }
            FunctionImpl::Suspendable(function) => function.invoke(arguments).await,
        }
    }
}
