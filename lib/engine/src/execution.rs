//! Per-call execution state machine.
//!
//! Every function call the coordinator runs is tracked as a
//! [`CallExecution`]. Legal transitions:
//!
//! ```text
//! Running ──► Completed
//!    │  └───► Failed
//!    ▼
//! Suspended ──(resume)──► Running
//! ```
//!
//! `Completed` and `Failed` are terminal.

use crate::error::CallStateError;
use chrono::{DateTime, Utc};
use deferral_conversation::{FunctionCall, Handler, SuspendedCallRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// The status of a single function call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// The function is executing.
    Running,
    /// The function is waiting for external input.
    Suspended,
    /// The function produced a result.
    Completed,
    /// The function failed or was rejected before running.
    Failed,
}

impl CallStatus {
    /// Returns true if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Suspended => "suspended",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Suspended | Self::Completed | Self::Failed)
                | (Self::Suspended, Self::Running)
        )
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution record for one function call within a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExecution {
    /// The model-assigned call id.
    pub call_id: String,
    /// The function called.
    pub function_name: String,
    /// Arguments as requested by the model. Empty on a resumed call.
    pub arguments: JsonValue,
    /// Current status.
    pub status: CallStatus,
    /// Result text, once completed.
    pub output: Option<String>,
    /// Failure reason, once failed.
    pub error: Option<String>,
    /// What the call is waiting on, while suspended.
    pub handler: Option<Handler>,
    /// When this execution started (or resumed).
    pub started_at: DateTime<Utc>,
    /// When this execution reached a terminal state or suspended.
    pub finished_at: Option<DateTime<Utc>>,
}

impl CallExecution {
    /// Starts executing a model-requested call.
    #[must_use]
    pub fn start(call: &FunctionCall) -> Self {
        Self {
            call_id: call.id.clone(),
            function_name: call.name.clone(),
            arguments: call.arguments.clone(),
            status: CallStatus::Running,
            output: None,
            error: None,
            handler: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Rebuilds the suspended call described by a persisted record.
    #[must_use]
    pub fn from_record(record: &SuspendedCallRecord) -> Self {
        Self {
            call_id: record.call_id.clone(),
            function_name: record.function_name.clone(),
            arguments: JsonValue::Null,
            status: CallStatus::Suspended,
            output: None,
            error: None,
            handler: Some(record.handler.clone()),
            started_at: record.suspended_at,
            finished_at: None,
        }
    }

    fn transition(&mut self, next: CallStatus) -> Result<(), CallStateError> {
        if !self.status.can_become(next) {
            return Err(CallStateError::InvalidTransition {
                call_id: self.call_id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Marks the call suspended, waiting on `handler`.
    pub fn suspend(&mut self, handler: Handler) -> Result<(), CallStateError> {
        self.transition(CallStatus::Suspended)?;
        self.handler = Some(handler);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Moves a suspended call back to running.
    pub fn resume(&mut self) -> Result<(), CallStateError> {
        self.transition(CallStatus::Running)?;
        self.started_at = Utc::now();
        self.finished_at = None;
        Ok(())
    }

    /// Marks the call completed with `output`.
    pub fn complete(&mut self, output: impl Into<String>) -> Result<(), CallStateError> {
        self.transition(CallStatus::Completed)?;
        self.output = Some(output.into());
        self.handler = None;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Marks the call failed.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), CallStateError> {
        self.transition(CallStatus::Failed)?;
        self.error = Some(reason.into());
        self.handler = None;
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deferral_conversation::{DeferredResult, DeferredState};
    use deferral_core::ConversationId;

    fn call() -> FunctionCall {
        FunctionCall::new("call_1", "expense_approval", serde_json::json!({"amount": 250}))
    }

    #[test]
    fn running_to_completed() {
        let mut execution = CallExecution::start(&call());
        assert_eq!(execution.status, CallStatus::Running);

        execution.complete("done").expect("complete");
        assert_eq!(execution.status, CallStatus::Completed);
        assert_eq!(execution.output.as_deref(), Some("done"));
        assert!(execution.finished_at.is_some());
    }

    #[test]
    fn suspend_resume_complete() {
        let mut execution = CallExecution::start(&call());
        execution
            .suspend(Handler::get_approval("Manager approval needed"))
            .expect("suspend");
        assert_eq!(execution.status, CallStatus::Suspended);
        assert!(execution.handler.is_some());

        execution.resume().expect("resume");
        execution.complete("approved").expect("complete");
        assert_eq!(execution.status, CallStatus::Completed);
        assert!(execution.handler.is_none());
    }

    #[test]
    fn terminal_states_reject_changes() {
        let mut execution = CallExecution::start(&call());
        execution.fail("boom").expect("fail");

        let err = execution.complete("late").expect_err("terminal");
        assert_eq!(
            err,
            CallStateError::InvalidTransition {
                call_id: "call_1".to_string(),
                from: CallStatus::Failed,
                to: CallStatus::Completed,
            }
        );
        assert!(execution.resume().is_err());
    }

    #[test]
    fn suspended_call_cannot_complete_without_resuming() {
        let mut execution = CallExecution::start(&call());
        execution.suspend(Handler::ask_user("Which day?")).expect("suspend");
        assert!(execution.complete("Tuesday").is_err());
    }

    #[test]
    fn from_record_is_suspended() {
        let record = SuspendedCallRecord::new(
            ConversationId::new(),
            "expense_approval",
            "call_7",
            DeferredResult::new(DeferredState::new(), Handler::timer(60, "Check back")),
        );

        let execution = CallExecution::from_record(&record);
        assert_eq!(execution.status, CallStatus::Suspended);
        assert_eq!(execution.call_id, "call_7");
        assert_eq!(execution.started_at, record.suspended_at);
    }
}
