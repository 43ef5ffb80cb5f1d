//! Suspended function calls and their persistence.
//!
//! A suspendable function that cannot finish returns a [`DeferredResult`]
//! instead of a value. The engine persists it as a [`SuspendedCallRecord`]
//! keyed by conversation; at most one record exists per conversation, so
//! [`SuspensionStore::put`] always replaces.

use crate::error::{StateDecodeError, SuspensionError};
use crate::handler::Handler;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deferral_core::ConversationId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::RwLock;

/// Opaque key-value state a suspended function needs on resume.
///
/// Only the function that produced it interprets the contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeferredState(Map<String, JsonValue>);

impl DeferredState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Adds a key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Returns the value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Returns the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    /// Builds state from any serializable struct.
    ///
    /// # Errors
    ///
    /// Fails if `value` does not serialize to a JSON object.
    pub fn encode<T: Serialize>(value: &T) -> Result<Self, StateDecodeError> {
        match serde_json::to_value(value) {
            Ok(JsonValue::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(StateDecodeError {
                reason: format!("expected an object, got {other}"),
            }),
            Err(e) => Err(StateDecodeError {
                reason: e.to_string(),
            }),
        }
    }

    /// Decodes the state into the type the function stored.
    ///
    /// # Errors
    ///
    /// Fails if the state does not have the shape of `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StateDecodeError> {
        serde_json::from_value(JsonValue::Object(self.0.clone())).map_err(|e| StateDecodeError {
            reason: e.to_string(),
        })
    }
}

impl From<Map<String, JsonValue>> for DeferredState {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

/// What a suspendable function returns instead of a final value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredResult {
    /// State to hand back to the function on resume.
    pub state: DeferredState,
    /// The external interaction that resumes the function.
    pub handler: Handler,
}

impl DeferredResult {
    /// Creates a deferred result.
    #[must_use]
    pub fn new(state: DeferredState, handler: Handler) -> Self {
        Self { state, handler }
    }
}

/// The persisted form of a suspended function call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendedCallRecord {
    /// The conversation this call belongs to.
    pub conversation_id: ConversationId,
    /// The function that suspended.
    pub function_name: String,
    /// The model-assigned call id; the eventual result refers back to it.
    pub call_id: String,
    /// State to pass to the function's resume.
    pub state: DeferredState,
    /// What resumes the call.
    pub handler: Handler,
    /// When the call (most recently) suspended.
    pub suspended_at: DateTime<Utc>,
}

impl SuspendedCallRecord {
    /// Creates a record for a call that just returned `deferred`.
    #[must_use]
    pub fn new(
        conversation_id: ConversationId,
        function_name: impl Into<String>,
        call_id: impl Into<String>,
        deferred: DeferredResult,
    ) -> Self {
        Self {
            conversation_id,
            function_name: function_name.into(),
            call_id: call_id.into(),
            state: deferred.state,
            handler: deferred.handler,
            suspended_at: Utc::now(),
        }
    }
}

/// Trait for suspension storage.
///
/// Every operation must be atomic for a single conversation id: a reader
/// never observes a partially written record.
#[async_trait]
pub trait SuspensionStore: Send + Sync {
    /// Stores a record, replacing any existing one for the conversation.
    async fn put(&self, record: SuspendedCallRecord) -> Result<(), SuspensionError>;

    /// Gets the outstanding record for a conversation, if any.
    async fn get(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<SuspendedCallRecord>, SuspensionError>;

    /// Removes the outstanding record for a conversation, if any.
    async fn clear(&self, conversation_id: ConversationId) -> Result<(), SuspensionError>;
}

/// In-process suspension store.
///
/// Records are kept in their serialized JSON form, so anything that does not
/// survive serialization fails here the same way it would against a real
/// backend.
#[derive(Debug, Default)]
pub struct InMemorySuspensionStore {
    records: RwLock<HashMap<ConversationId, String>>,
}

impl InMemorySuspensionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many conversations have an outstanding suspension.
    ///
    /// # Errors
    ///
    /// Fails if the store's lock is poisoned.
    pub fn len(&self) -> Result<usize, SuspensionError> {
        self.records
            .read()
            .map(|records| records.len())
            .map_err(poisoned)
    }

    /// Returns whether no conversation has an outstanding suspension.
    ///
    /// # Errors
    ///
    /// Fails if the store's lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, SuspensionError> {
        self.len().map(|len| len == 0)
    }

    /// Stores raw serialized data for a conversation.
    ///
    /// Lets operators and tests place arbitrary (even invalid) records.
    ///
    /// # Errors
    ///
    /// Fails if the store's lock is poisoned.
    pub fn put_raw(
        &self,
        conversation_id: ConversationId,
        raw: impl Into<String>,
    ) -> Result<(), SuspensionError> {
        self.records
            .write()
            .map_err(poisoned)?
            .insert(conversation_id, raw.into());
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> SuspensionError {
    SuspensionError::StorageFailed {
        reason: "suspension store lock poisoned".to_string(),
    }
}

#[async_trait]
impl SuspensionStore for InMemorySuspensionStore {
    async fn put(&self, record: SuspendedCallRecord) -> Result<(), SuspensionError> {
        let raw = serde_json::to_string(&record).map_err(|e| SuspensionError::StorageFailed {
            reason: e.to_string(),
        })?;
        self.put_raw(record.conversation_id, raw)
    }

    async fn get(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Option<SuspendedCallRecord>, SuspensionError> {
        let records = self.records.read().map_err(poisoned)?;
        records
            .get(&conversation_id)
            .map(|raw| {
                serde_json::from_str(raw).map_err(|e| SuspensionError::CorruptedRecord {
                    conversation_id,
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    async fn clear(&self, conversation_id: ConversationId) -> Result<(), SuspensionError> {
        self.records.write().map_err(poisoned)?.remove(&conversation_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(conversation_id: ConversationId) -> SuspendedCallRecord {
        SuspendedCallRecord::new(
            conversation_id,
            "expense_approval",
            "call_1",
            DeferredResult::new(
                DeferredState::new()
                    .with("amount", serde_json::json!(250))
                    .with("doc", serde_json::json!("Office supplies"))
                    .with("stage", serde_json::json!("manager")),
                Handler::get_approval("Manager approval needed"),
            ),
        )
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Progress {
        step: u32,
        notes: Vec<String>,
    }

    #[test]
    fn deferred_state_encode_decode() {
        let progress = Progress {
            step: 2,
            notes: vec!["first".to_string()],
        };

        let state = DeferredState::encode(&progress).expect("encode");
        assert_eq!(state.get("step"), Some(&serde_json::json!(2)));

        let decoded: Progress = state.decode().expect("decode");
        assert_eq!(decoded, progress);
    }

    #[test]
    fn deferred_state_rejects_non_objects() {
        assert!(DeferredState::encode(&42).is_err());
    }

    #[test]
    fn deferred_state_decode_reports_shape_mismatch() {
        let state = DeferredState::new().with("step", serde_json::json!("two"));
        let err = state.decode::<Progress>().expect_err("should fail");
        assert!(err.reason.contains("invalid type"));
    }

    #[tokio::test]
    async fn store_round_trip_is_lossless() {
        let store = InMemorySuspensionStore::new();
        let conversation_id = ConversationId::new();
        let record = sample_record(conversation_id);

        store.put(record.clone()).await.expect("put");
        let loaded = store.get(conversation_id).await.expect("get");

        assert_eq!(loaded, Some(record));
    }

    #[tokio::test]
    async fn put_replaces_existing_record() {
        let store = InMemorySuspensionStore::new();
        let conversation_id = ConversationId::new();

        store.put(sample_record(conversation_id)).await.expect("put");
        let mut second = sample_record(conversation_id);
        second.call_id = "call_2".to_string();
        store.put(second).await.expect("put");

        assert_eq!(store.len().expect("len"), 1);
        let loaded = store.get(conversation_id).await.expect("get").expect("record");
        assert_eq!(loaded.call_id, "call_2");
    }

    #[tokio::test]
    async fn clear_removes_only_that_conversation() {
        let store = InMemorySuspensionStore::new();
        let first = ConversationId::new();
        let second = ConversationId::new();

        store.put(sample_record(first)).await.expect("put");
        store.put(sample_record(second)).await.expect("put");
        store.clear(first).await.expect("clear");

        assert!(store.get(first).await.expect("get").is_none());
        assert!(store.get(second).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn unreadable_record_is_reported_as_corrupted() {
        let store = InMemorySuspensionStore::new();
        let conversation_id = ConversationId::new();
        store.put_raw(conversation_id, "{not json").expect("put_raw");

        let err = store.get(conversation_id).await.expect_err("should fail");
        assert!(matches!(err, SuspensionError::CorruptedRecord { .. }));
    }
}
