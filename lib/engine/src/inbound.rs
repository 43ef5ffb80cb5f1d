//! Inbound events.
//!
//! Channel adapters (plain messages, card actions, webhook receivers, timer
//! schedulers) turn what they receive into an [`InboundEvent`] and hand it to
//! the coordinator. The event's channel is what the resume router matches
//! against an outstanding suspension.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// The kind of channel an event arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundChannel {
    /// Free-text user message.
    Text,
    /// Structured action, such as a card button.
    Action,
    /// Webhook callback.
    Webhook,
    /// Scheduled timer re-entry.
    Timer,
}

impl InboundChannel {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Action => "action",
            Self::Webhook => "webhook",
            Self::Timer => "timer",
        }
    }
}

impl fmt::Display for InboundChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event delivered to a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A plain user message.
    Text { text: String },
    /// A structured action with a verb and optional payload.
    Action {
        verb: String,
        #[serde(default)]
        data: JsonValue,
    },
    /// A webhook delivery.
    Webhook { payload: JsonValue },
    /// A scheduled re-entry after a timer elapsed.
    TimerFired,
}

impl InboundEvent {
    /// Creates a text event.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates an action event with no payload.
    #[must_use]
    pub fn action(verb: impl Into<String>) -> Self {
        Self::Action {
            verb: verb.into(),
            data: JsonValue::Null,
        }
    }

    /// Creates an action event with a payload.
    #[must_use]
    pub fn action_with_data(verb: impl Into<String>, data: JsonValue) -> Self {
        Self::Action {
            verb: verb.into(),
            data,
        }
    }

    /// Creates a webhook event.
    #[must_use]
    pub fn webhook(payload: JsonValue) -> Self {
        Self::Webhook { payload }
    }

    /// Returns the channel this event arrived on.
    #[must_use]
    pub fn channel(&self) -> InboundChannel {
        match self {
            Self::Text { .. } => InboundChannel::Text,
            Self::Action { .. } => InboundChannel::Action,
            Self::Webhook { .. } => InboundChannel::Webhook,
            Self::TimerFired => InboundChannel::Timer,
        }
    }

    /// Returns the text of a text event.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Renders the event as the user message recorded for a fresh turn.
    #[must_use]
    pub fn to_user_text(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Action { verb, data } if data.is_null() => format!("[action] {verb}"),
            Self::Action { verb, data } => format!("[action] {verb} {data}"),
            Self::Webhook { payload } => format!("[webhook] {payload}"),
            Self::TimerFired => "[timer fired]".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels() {
        assert_eq!(InboundEvent::text("hi").channel(), InboundChannel::Text);
        assert_eq!(InboundEvent::action("approve").channel(), InboundChannel::Action);
        assert_eq!(
            InboundEvent::webhook(serde_json::json!({})).channel(),
            InboundChannel::Webhook
        );
        assert_eq!(InboundEvent::TimerFired.channel(), InboundChannel::Timer);
    }

    #[test]
    fn user_text_rendering() {
        assert_eq!(InboundEvent::text("hello").to_user_text(), "hello");
        assert_eq!(InboundEvent::action("approve").to_user_text(), "[action] approve");
        assert_eq!(
            InboundEvent::action_with_data("select", serde_json::json!({"option": "B"}))
                .to_user_text(),
            "[action] select {\"option\":\"B\"}"
        );
        assert_eq!(InboundEvent::TimerFired.to_user_text(), "[timer fired]");
    }

    #[test]
    fn serde_tagging() {
        let event: InboundEvent =
            serde_json::from_value(serde_json::json!({"channel": "action", "verb": "deny"}))
                .expect("deserialize");
        assert_eq!(event, InboundEvent::action("deny"));
    }
}
