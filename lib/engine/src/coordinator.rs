//! Execution coordinator.
//!
//! The coordinator drives one turn of a conversation:
//! 1. Ask the router whether the inbound event resumes a suspended call
//! 2. If so, resume it; a completed resume feeds its result to the model
//! 3. Otherwise record the input and call the model
//! 4. Execute the requested calls in order, stopping at the first suspension
//! 5. Feed results back to the model until it answers, bounded by
//!    `max_depth` model calls
//!
//! Messages produced by a batch of calls are written only once the batch
//! ends, so a fatal error part way through leaves no trace of it in memory.

use crate::config::EngineConfig;
use crate::dispatch::ListenerRegistration;
use crate::error::{FunctionError, TurnError};
use crate::execution::CallExecution;
use crate::function::{FunctionImpl, FunctionOutcome, SuspendableFunction};
use crate::inbound::InboundEvent;
use crate::registry::FunctionRegistry;
use crate::router::{ContentClassifier, FreshReason, ResumeRouter, RouteDecision};
use deferral_ai::{GenerateRequest, ModelGateway, ModelReply};
use deferral_conversation::{
    ConversationMemory, ConversationState, FunctionCall, FunctionResult, Handler, Message,
    SuspendedCallRecord, SuspensionStore,
};
use deferral_core::{ConversationId, TurnId};
use rootcause::Report;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The model gave a final answer.
    Completed {
        /// The model's answer.
        message: Message,
        /// Every call executed during the turn.
        calls: Vec<CallExecution>,
    },
    /// A function is waiting for external input.
    Suspended {
        /// The suspended call.
        call: CallExecution,
        /// What resumes it.
        handler: Handler,
        /// Every call executed during the turn, including the suspended one.
        calls: Vec<CallExecution>,
    },
}

impl TurnOutcome {
    /// Returns true if the turn ended in a suspension.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended { .. })
    }

    /// Returns every call executed during the turn.
    #[must_use]
    pub fn calls(&self) -> &[CallExecution] {
        match self {
            Self::Completed { calls, .. } | Self::Suspended { calls, .. } => calls,
        }
    }

    /// Returns the text to show the user.
    #[must_use]
    pub fn visible_text(&self) -> String {
        match self {
            Self::Completed { message, .. } => message.content.clone(),
            Self::Suspended { handler, .. } => handler.display_text(),
        }
    }

    /// Returns what to arm so the suspended call can be resumed.
    #[must_use]
    pub fn listener(&self, conversation_id: ConversationId) -> Option<ListenerRegistration> {
        match self {
            Self::Completed { .. } => None,
            Self::Suspended { call, handler, .. } => Some(ListenerRegistration::new(
                conversation_id,
                &call.call_id,
                handler,
            )),
        }
    }
}

enum BatchOutcome {
    Finished,
    Suspended { call: CallExecution, handler: Handler },
}

enum ResumeOutcome {
    Continue(CallExecution),
    Suspended { call: CallExecution, handler: Handler },
    Fallback,
}

/// Drives conversation turns through the model and registered functions.
pub struct ExecutionCoordinator {
    registry: Arc<FunctionRegistry>,
    memory: Arc<dyn ConversationMemory>,
    suspensions: Arc<dyn SuspensionStore>,
    gateway: Arc<dyn ModelGateway>,
    router: ResumeRouter,
    config: EngineConfig,
    locks: Mutex<HashMap<ConversationId, Arc<Mutex<()>>>>,
}

impl ExecutionCoordinator {
    /// Creates a coordinator with the default configuration.
    #[must_use]
    pub fn new(
        registry: Arc<FunctionRegistry>,
        memory: Arc<dyn ConversationMemory>,
        suspensions: Arc<dyn SuspensionStore>,
        gateway: Arc<dyn ModelGateway>,
    ) -> Self {
        let config = EngineConfig::default();
        Self {
            registry,
            memory,
            suspensions,
            gateway,
            router: ResumeRouter::new(config.resume_policy),
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Applies a configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.router = self.router.with_policy(config.resume_policy);
        self.config = config;
        self
    }

    /// Replaces the classifier used by the heuristic resume policy.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn ContentClassifier>) -> Self {
        self.router = self.router.with_classifier(classifier);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the function registry.
    #[must_use]
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Runs `work` inside the conversation's lock.
    ///
    /// The lock's table entry is dropped once nothing else holds or waits
    /// on it.
    async fn serialized<T>(
        &self,
        conversation_id: ConversationId,
        work: impl Future<Output = T>,
    ) -> T {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(conversation_id).or_default())
        };
        let output = {
            let _guard = lock.lock().await;
            work.await
        };

        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(&conversation_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&conversation_id);
        }
        output
    }

    /// Handles one inbound event for a conversation.
    ///
    /// Turns on the same conversation run one at a time; turns on different
    /// conversations run concurrently.
    ///
    /// # Errors
    ///
    /// Returns an error if the turn fails. Suspensions are not errors.
    #[instrument(
        skip(self, event),
        fields(conversation_id = %conversation_id, turn_id = %TurnId::new(), channel = %event.channel())
    )]
    pub async fn handle_turn(
        &self,
        conversation_id: ConversationId,
        event: InboundEvent,
    ) -> Result<TurnOutcome, Report<TurnError>> {
        Ok(self
            .serialized(conversation_id, self.run_turn(conversation_id, &event))
            .await?)
    }

    /// Returns true if the conversation has a suspended call waiting.
    ///
    /// # Errors
    ///
    /// Returns an error if the suspension store fails or holds an unreadable
    /// record.
    pub async fn requires_resuming(
        &self,
        conversation_id: ConversationId,
    ) -> Result<bool, Report<TurnError>> {
        let suspension = self
            .suspensions
            .get(conversation_id)
            .await
            .map_err(TurnError::from)?;
        Ok(suspension.is_some())
    }

    /// Returns the conversation's history and outstanding suspension.
    ///
    /// # Errors
    ///
    /// Returns an error if memory or the suspension store fails.
    pub async fn conversation_state(
        &self,
        conversation_id: ConversationId,
    ) -> Result<ConversationState, Report<TurnError>> {
        Ok(self
            .serialized(conversation_id, self.load_state(conversation_id))
            .await?)
    }

    async fn load_state(&self, conversation_id: ConversationId) -> Result<ConversationState, TurnError> {
        Ok(ConversationState {
            conversation_id,
            history: self.memory.get_history(conversation_id).await?,
            suspension: self.suspensions.get(conversation_id).await?,
        })
    }

    /// Drops the conversation's outstanding suspension without resuming it.
    ///
    /// Works on unreadable records too.
    ///
    /// # Errors
    ///
    /// Returns an error if the suspension store fails.
    #[instrument(skip(self), fields(conversation_id = %conversation_id))]
    pub async fn abandon_suspension(
        &self,
        conversation_id: ConversationId,
    ) -> Result<(), Report<TurnError>> {
        self.serialized(conversation_id, self.suspensions.clear(conversation_id))
            .await
            .map_err(TurnError::from)?;
        info!("suspension abandoned");
        Ok(())
    }

    async fn run_turn(
        &self,
        conversation_id: ConversationId,
        event: &InboundEvent,
    ) -> Result<TurnOutcome, TurnError> {
        let suspension = self.suspensions.get(conversation_id).await?;

        match self.router.route(suspension, event) {
            RouteDecision::Resume(record) => {
                match self.resume(conversation_id, record, event).await? {
                    ResumeOutcome::Continue(call) => {
                        return self.drive(conversation_id, vec![call]).await;
                    }
                    ResumeOutcome::Suspended { call, handler } => {
                        return Ok(TurnOutcome::Suspended {
                            calls: vec![call.clone()],
                            call,
                            handler,
                        });
                    }
                    ResumeOutcome::Fallback => {}
                }
            }
            RouteDecision::Fresh {
                reason: FreshReason::NoSuspension,
            } => debug!("no suspension outstanding"),
            RouteDecision::Fresh { reason } => {
                debug!(%reason, "suspension left waiting, handling input as a fresh turn");
            }
        }

        self.memory
            .append_message(conversation_id, Message::user(event.to_user_text()))
            .await?;
        self.drive(conversation_id, Vec::new()).await
    }

    async fn drive(
        &self,
        conversation_id: ConversationId,
        mut calls: Vec<CallExecution>,
    ) -> Result<TurnOutcome, TurnError> {
        let functions = self.registry.declarations();
        let max_depth = self.config.max_depth;
        let mut model_calls = 0;

        loop {
            if model_calls >= max_depth {
                warn!(max_depth, "turn exceeded model call limit");
                return Err(TurnError::MaxRecursionExceeded { max_depth });
            }
            model_calls += 1;

            let history = self.memory.get_history(conversation_id).await?;
            let mut request = GenerateRequest::new(history).with_functions(functions.clone());
            if let Some(instructions) = &self.config.instructions {
                request = request.with_system(instructions.clone());
            }

            debug!(model = self.gateway.model(), model_calls, "calling model");
            let (content, requested) = match self.gateway.generate(&request).await? {
                ModelReply::FunctionCalls {
                    content,
                    calls: requested,
                } if !requested.is_empty() => (content, requested),
                reply => {
                    let message = reply.into_message();
                    self.memory
                        .append_message(conversation_id, message.clone())
                        .await?;
                    info!(model_calls, calls = calls.len(), "turn completed");
                    return Ok(TurnOutcome::Completed { message, calls });
                }
            };

            debug!(model_calls, requested = requested.len(), "model requested calls");
            if let BatchOutcome::Suspended { call, handler } = self
                .execute_batch(conversation_id, content, requested, &mut calls)
                .await?
            {
                return Ok(TurnOutcome::Suspended {
                    call,
                    handler,
                    calls,
                });
            }
        }
    }

    async fn execute_batch(
        &self,
        conversation_id: ConversationId,
        content: String,
        requested: Vec<FunctionCall>,
        calls: &mut Vec<CallExecution>,
    ) -> Result<BatchOutcome, TurnError> {
        let mut results = Vec::with_capacity(requested.len());

        for (index, call) in requested.iter().enumerate() {
            let registered =
                self.registry
                    .get(&call.name)
                    .ok_or_else(|| TurnError::UnknownFunction {
                        name: call.name.clone(),
                    })?;
            let mut execution = CallExecution::start(call);

            let arguments = match registered.schema().validate(&call.name, &call.arguments) {
                Ok(arguments) => arguments,
                Err(violation) => {
                    warn!(function = %call.name, call_id = %call.id, error = %violation, "rejected arguments");
                    let reason = violation.to_string();
                    results.push(Message::function_result(FunctionResult::failure(
                        &call.id, &reason,
                    )));
                    execution.fail(reason)?;
                    calls.push(execution);
                    continue;
                }
            };

            debug!(function = %call.name, call_id = %call.id, "invoking function");
            match registered.descriptor().invoke(&arguments).await {
                Ok(FunctionOutcome::Completed(output)) => {
                    results.push(Message::function_result(FunctionResult::success(
                        &call.id, &output,
                    )));
                    execution.complete(output)?;
                }
                Ok(FunctionOutcome::Deferred(deferred)) => {
                    let handler = deferred.handler.clone();
                    execution.suspend(handler.clone())?;

                    let mut messages = Vec::with_capacity(results.len() + 1);
                    messages.push(
                        Message::assistant(content)
                            .with_function_calls(requested[..=index].to_vec()),
                    );
                    messages.extend(results);
                    let record =
                        SuspendedCallRecord::new(conversation_id, &call.name, &call.id, deferred);
                    self.persist_suspension(record, messages).await?;

                    info!(
                        function = %call.name,
                        call_id = %call.id,
                        handler = %handler.kind(),
                        discarded = requested.len() - index - 1,
                        "function suspended"
                    );
                    calls.push(execution.clone());
                    return Ok(BatchOutcome::Suspended {
                        call: execution,
                        handler,
                    });
                }
                Err(error) => {
                    warn!(function = %call.name, call_id = %call.id, %error, "function failed");
                    results.push(Message::function_result(FunctionResult::failure(
                        &call.id,
                        error.reason(),
                    )));
                    execution.fail(error.reason())?;
                }
            }
            calls.push(execution);
        }

        let mut messages = Vec::with_capacity(results.len() + 1);
        messages.push(Message::assistant(content).with_function_calls(requested));
        messages.extend(results);
        self.memory.append_messages(conversation_id, messages).await?;
        Ok(BatchOutcome::Finished)
    }

    async fn persist_suspension(
        &self,
        record: SuspendedCallRecord,
        messages: Vec<Message>,
    ) -> Result<(), TurnError> {
        let conversation_id = record.conversation_id;
        self.suspensions.put(record).await?;

        if let Err(e) = self.memory.append_messages(conversation_id, messages).await {
            if let Err(clear_error) = self.suspensions.clear(conversation_id).await {
                warn!(error = %clear_error, "failed to roll back suspension");
            }
            return Err(e.into());
        }
        Ok(())
    }

    async fn resume(
        &self,
        conversation_id: ConversationId,
        record: SuspendedCallRecord,
        event: &InboundEvent,
    ) -> Result<ResumeOutcome, TurnError> {
        let registered =
            self.registry
                .get(&record.function_name)
                .ok_or_else(|| TurnError::UnknownFunction {
                    name: record.function_name.clone(),
                })?;
        let FunctionImpl::Suspendable(function) = &registered.descriptor().implementation else {
            warn!(function = %record.function_name, "suspension names a function that cannot resume");
            return Err(TurnError::SuspensionStateCorrupted {
                conversation_id,
                reason: format!("function '{}' is not suspendable", record.function_name),
            });
        };

        let mut execution = CallExecution::from_record(&record);
        execution.resume()?;
        info!(function = %record.function_name, call_id = %record.call_id, "resuming suspended call");

        // The record is claimed before the function runs and put back unless
        // the call completed, failed or suspended again.
        self.suspensions.clear(conversation_id).await?;
        let outcome = self
            .run_resumed(function.as_ref(), &record, event, execution)
            .await;
        match &outcome {
            Ok(ResumeOutcome::Continue(_) | ResumeOutcome::Suspended { .. }) => {}
            Ok(ResumeOutcome::Fallback) | Err(_) => self.restore_suspension(record).await,
        }
        outcome
    }

    async fn run_resumed(
        &self,
        function: &dyn SuspendableFunction,
        record: &SuspendedCallRecord,
        event: &InboundEvent,
        mut execution: CallExecution,
    ) -> Result<ResumeOutcome, TurnError> {
        let conversation_id = record.conversation_id;
        match function.resume(event, record.state.clone()).await {
            Ok(FunctionOutcome::Completed(output)) => {
                let result = FunctionResult::success(&record.call_id, &output);
                execution.complete(output)?;
                self.memory
                    .append_message(conversation_id, Message::function_result(result))
                    .await?;
                Ok(ResumeOutcome::Continue(execution))
            }
            Ok(FunctionOutcome::Deferred(deferred)) => {
                let handler = deferred.handler.clone();
                execution.suspend(handler.clone())?;
                self.suspensions
                    .put(SuspendedCallRecord::new(
                        conversation_id,
                        &record.function_name,
                        &record.call_id,
                        deferred,
                    ))
                    .await?;
                info!(function = %record.function_name, handler = %handler.kind(), "resumed call suspended again");
                Ok(ResumeOutcome::Suspended {
                    call: execution,
                    handler,
                })
            }
            Err(FunctionError::Failed { reason }) => {
                warn!(function = %record.function_name, %reason, "resumed call failed");
                let result = FunctionResult::failure(&record.call_id, &reason);
                execution.fail(reason)?;
                self.memory
                    .append_message(conversation_id, Message::function_result(result))
                    .await?;
                Ok(ResumeOutcome::Continue(execution))
            }
            Err(FunctionError::CorruptedState { reason }) => {
                warn!(function = %record.function_name, %reason, "suspended call state is corrupted, leaving record in place");
                Err(TurnError::SuspensionStateCorrupted {
                    conversation_id,
                    reason,
                })
            }
            Err(FunctionError::InputMismatch { reason })
                if self.router.policy().falls_back_on_mismatch() =>
            {
                warn!(function = %record.function_name, %reason, "input does not resume call, handling as a fresh turn");
                Ok(ResumeOutcome::Fallback)
            }
            Err(FunctionError::InputMismatch { reason }) => {
                warn!(function = %record.function_name, %reason, "input does not resume call");
                Err(TurnError::ResumeMismatch {
                    function: record.function_name.clone(),
                    reason,
                })
            }
        }
    }

    async fn restore_suspension(&self, record: SuspendedCallRecord) {
        if let Err(e) = self.suspensions.put(record).await {
            warn!(error = %e, "failed to restore suspension");
        }
    }
}
