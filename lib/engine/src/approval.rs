//! Approval gate for ordinary functions.
//!
//! [`require_approval`] turns any ordinary function into a suspendable one
//! that first asks for approval and only runs the wrapped function once the
//! approving action arrives.

use crate::error::{FunctionError, RegistryError};
use crate::function::{
    FunctionDescriptor, FunctionImpl, FunctionOutcome, SuspendableFunction, SyncFunction,
};
use crate::inbound::InboundEvent;
use async_trait::async_trait;
use deferral_conversation::{DeferredState, Handler};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// An approve-or-deny answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Denied,
}

impl ApprovalDecision {
    /// Reads a decision from an action verb or a text reply.
    ///
    /// Returns `None` for anything that is neither approval nor denial.
    #[must_use]
    pub fn from_event(event: &InboundEvent) -> Option<Self> {
        let word = match event {
            InboundEvent::Action { verb, .. } => verb.as_str(),
            InboundEvent::Text { text } => text.as_str(),
            InboundEvent::Webhook { .. } | InboundEvent::TimerFired => return None,
        };

        match word.trim().to_lowercase().as_str() {
            "approve" | "approved" | "yes" | "confirm" => Some(Self::Approved),
            "deny" | "denied" | "reject" | "no" | "cancel" => Some(Self::Denied),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PendingApproval {
    arguments: JsonValue,
}

struct ApprovalGate {
    name: String,
    prompt: String,
    inner: Arc<dyn SyncFunction>,
}

#[async_trait]
impl SuspendableFunction for ApprovalGate {
    async fn invoke(&self, arguments: &JsonValue) -> Result<FunctionOutcome, FunctionError> {
        let state = DeferredState::encode(&PendingApproval {
            arguments: arguments.clone(),
        })?;
        Ok(FunctionOutcome::deferred(
            state,
            Handler::get_approval(&self.prompt),
        ))
    }

    async fn resume(
        &self,
        input: &InboundEvent,
        state: DeferredState,
    ) -> Result<FunctionOutcome, FunctionError> {
        let pending: PendingApproval = state.decode()?;
        match ApprovalDecision::from_event(input) {
            Some(ApprovalDecision::Approved) => {
                let result = self.inner.invoke(&pending.arguments).await?;
                Ok(FunctionOutcome::completed(format!(
                    "Approved and executed: {result}"
                )))
            }
            Some(ApprovalDecision::Denied) => Ok(FunctionOutcome::completed(format!(
                "Denied: execution of {} was cancelled by user.",
                self.name
            ))),
            None => Err(FunctionError::input_mismatch(format!(
                "expected approve or deny for {}",
                self.name
            ))),
        }
    }
}

/// Wraps an ordinary function so that it runs only after approval.
///
/// The wrapped descriptor keeps the name, description and parameters of
/// the wrapped function.
///
/// # Errors
///
/// Returns [`RegistryError::NotWrappable`] if `descriptor` is already
/// suspendable.
pub fn require_approval(
    descriptor: FunctionDescriptor,
    prompt: impl Into<String>,
) -> Result<FunctionDescriptor, Report<RegistryError>> {
    let FunctionImpl::Sync(inner) = descriptor.implementation else {
        return Err(RegistryError::NotWrappable {
            name: descriptor.name,
        }
        .into());
    };

    let gate = ApprovalGate {
        name: descriptor.name.clone(),
        prompt: prompt.into(),
        inner,
    };
    Ok(FunctionDescriptor::suspendable(descriptor.name, descriptor.description, gate)
        .with_parameters(descriptor.parameters))
}
