//! A gateway that replays a fixed script.
//!
//! Used by the demo binary and by tests that need the model to ask for
//! specific function calls in a specific order.

use crate::error::ModelGatewayError;
use crate::gateway::{GenerateRequest, ModelGateway, ModelReply};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::debug;

/// Replays queued replies in order and records every request it sees.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Result<ModelReply, ModelGatewayError>>>,
    fallback: Option<ModelReply>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedGateway {
    /// Creates a gateway with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway that answers every request with `reply`.
    #[must_use]
    pub fn repeating(reply: ModelReply) -> Self {
        Self {
            fallback: Some(reply),
            ..Self::default()
        }
    }

    /// Queues a reply.
    #[must_use]
    pub fn with_reply(self, reply: ModelReply) -> Self {
        self.push(Ok(reply));
        self
    }

    /// Queues a failure.
    #[must_use]
    pub fn with_error(self, error: ModelGatewayError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, entry: Result<ModelReply, ModelGatewayError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Returns how many times `generate` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|requests| requests.len()).unwrap_or(0)
    }

    /// Returns how many queued replies have not been consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|script| script.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelReply, ModelGatewayError> {
        let calls_made = {
            let mut requests = self
                .requests
                .lock()
                .map_err(|_| ModelGatewayError::RequestFailed {
                    reason: "scripted gateway lock poisoned".to_string(),
                })?;
            requests.push(request.clone());
            requests.len() - 1
        };

        let next = self
            .script
            .lock()
            .map_err(|_| ModelGatewayError::RequestFailed {
                reason: "scripted gateway lock poisoned".to_string(),
            })?
            .pop_front();

        debug!(calls_made, scripted = next.is_some(), "scripted model call");

        match next {
            Some(entry) => entry,
            None => self
                .fallback
                .clone()
                .ok_or(ModelGatewayError::ScriptExhausted { calls_made }),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
