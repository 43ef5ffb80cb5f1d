//! Handler dispatch table.
//!
//! Maps each kind of suspension to the inbound channel that resumes it.
//! The router uses it to reject input arriving on the wrong channel; the
//! surrounding application uses [`ListenerRegistration`] to know which
//! listener to arm for an outstanding suspension.

use crate::inbound::InboundChannel;
use deferral_conversation::{Handler, HandlerKind, SuspendedCallRecord};
use deferral_core::ConversationId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Returns the channel that resumes a suspension of `kind`.
#[must_use]
pub const fn expected_channel(kind: HandlerKind) -> InboundChannel {
    match kind {
        HandlerKind::AskUser => InboundChannel::Text,
        HandlerKind::GetApproval | HandlerKind::SelectFromOptions => InboundChannel::Action,
        HandlerKind::Webhook => InboundChannel::Webhook,
        HandlerKind::Timer => InboundChannel::Timer,
    }
}

/// Returns the channels an application must listen on to resume every
/// handler kind in `kinds`.
pub fn required_channels(kinds: impl IntoIterator<Item = HandlerKind>) -> BTreeSet<InboundChannel> {
    kinds.into_iter().map(expected_channel).collect()
}

/// What the application must arm to eventually resume a suspended call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerRegistration {
    /// The conversation waiting.
    pub conversation_id: ConversationId,
    /// The suspended call.
    pub call_id: String,
    /// The channel the resuming input must arrive on.
    pub channel: InboundChannel,
    /// For webhooks, where the callback is expected.
    pub webhook_url: Option<String>,
    /// For timers, how long until re-entry.
    pub timer_delay: Option<Duration>,
    /// Text to show whoever is expected to respond.
    pub prompt: String,
}

impl ListenerRegistration {
    /// Builds the registration for a suspension on `handler`.
    #[must_use]
    pub fn new(conversation_id: ConversationId, call_id: impl Into<String>, handler: &Handler) -> Self {
        let (webhook_url, timer_delay) = match handler {
            Handler::Webhook { url } => (Some(url.clone()), None),
            Handler::Timer { delay_seconds, .. } => (None, Some(Duration::from_secs(*delay_seconds))),
            _ => (None, None),
        };

        Self {
            conversation_id,
            call_id: call_id.into(),
            channel: expected_channel(handler.kind()),
            webhook_url,
            timer_delay,
            prompt: handler.display_text(),
        }
    }

    /// Builds the registration for a persisted record.
    #[must_use]
    pub fn for_record(record: &SuspendedCallRecord) -> Self {
        Self::new(record.conversation_id, &record.call_id, &record.handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deferral_conversation::{DeferredResult, DeferredState};

    #[test]
    fn every_kind_has_a_channel() {
        assert_eq!(expected_channel(HandlerKind::AskUser), InboundChannel::Text);
        assert_eq!(expected_channel(HandlerKind::GetApproval), InboundChannel::Action);
        assert_eq!(expected_channel(HandlerKind::SelectFromOptions), InboundChannel::Action);
        assert_eq!(expected_channel(HandlerKind::Webhook), InboundChannel::Webhook);
        assert_eq!(expected_channel(HandlerKind::Timer), InboundChannel::Timer);
    }

    #[test]
    fn required_channels_deduplicates() {
        let channels = required_channels(HandlerKind::ALL);
        assert_eq!(
            channels.into_iter().collect::<Vec<_>>(),
            [
                InboundChannel::Text,
                InboundChannel::Action,
                InboundChannel::Webhook,
                InboundChannel::Timer
            ]
        );
    }

    #[test]
    fn timer_registration_carries_delay() {
        let record = SuspendedCallRecord::new(
            ConversationId::new(),
            "reminder",
            "call_1",
            DeferredResult::new(DeferredState::new(), Handler::timer(90, "Time to stretch")),
        );

        let registration = ListenerRegistration::for_record(&record);
        assert_eq!(registration.channel, InboundChannel::Timer);
        assert_eq!(registration.timer_delay, Some(Duration::from_secs(90)));
        assert!(registration.webhook_url.is_none());
    }

    #[test]
    fn webhook_registration_carries_url() {
        let registration = ListenerRegistration::new(
            ConversationId::new(),
            "call_2",
            &Handler::webhook("https://hooks.example.com/payments"),
        );
        assert_eq!(registration.channel, InboundChannel::Webhook);
        assert_eq!(
            registration.webhook_url.as_deref(),
            Some("https://hooks.example.com/payments")
        );
    }
}
