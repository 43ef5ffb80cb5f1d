//! Resume routing.
//!
//! Decides, for each inbound event, whether it resumes the conversation's
//! outstanding suspension or starts a fresh turn. Structured suspensions
//! (approvals, selections, webhooks, timers) only ever resume from their own
//! channel. Free-text ask-user suspensions follow the configured
//! [`ResumePolicy`].

use crate::dispatch::expected_channel;
use crate::inbound::{InboundChannel, InboundEvent};
use deferral_conversation::{Handler, SuspendedCallRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How free text is matched against an outstanding ask-user suspension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumePolicy {
    /// Any text resumes the suspension.
    #[default]
    SuspensionFirst,
    /// Text resumes the suspension only if the content classifier accepts it.
    Heuristic,
    /// Text resumes the suspension; if the function reports the input does
    /// not fit, the same input is handled as a fresh turn.
    TryResumeThenFallback,
}

impl ResumePolicy {
    /// Returns true if a handler-reported mismatch falls back to a fresh turn.
    #[must_use]
    pub fn falls_back_on_mismatch(&self) -> bool {
        matches!(self, Self::TryResumeThenFallback)
    }
}

/// Decides whether free text answers an outstanding suspension.
pub trait ContentClassifier: Send + Sync {
    /// Returns true if `text` looks like a response to `handler`.
    fn accepts(&self, text: &str, handler: &Handler) -> bool;
}

/// Accepts text containing one of a fixed set of words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    /// Words that answer an approval prompt.
    pub const APPROVAL_KEYWORDS: [&'static str; 7] =
        ["yes", "no", "approve", "deny", "reject", "confirm", "cancel"];

    /// Creates a classifier over `keywords`, matched case-insensitively.
    #[must_use]
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(Self::APPROVAL_KEYWORDS)
    }
}

impl ContentClassifier for KeywordClassifier {
    fn accepts(&self, text: &str, _handler: &Handler) -> bool {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .any(|word| {
                let word = word.to_lowercase();
                self.keywords.iter().any(|k| *k == word)
            })
    }
}

/// Why an event was routed to a fresh turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshReason {
    /// Nothing is suspended.
    NoSuspension,
    /// A suspension is outstanding but expects another channel.
    ChannelMismatch {
        expected: InboundChannel,
        received: InboundChannel,
    },
    /// The content classifier did not accept the text.
    NotClassifiedAsResponse,
}

impl fmt::Display for FreshReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuspension => write!(f, "no suspension"),
            Self::ChannelMismatch { expected, received } => {
                write!(f, "expected {expected} input, received {received}")
            }
            Self::NotClassifiedAsResponse => write!(f, "text not classified as a response"),
        }
    }
}

/// The router's decision for one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Resume this suspended call.
    Resume(SuspendedCallRecord),
    /// Handle the event as a fresh turn.
    Fresh { reason: FreshReason },
}

/// Routes inbound events to suspensions or fresh turns.
#[derive(Clone)]
pub struct ResumeRouter {
    policy: ResumePolicy,
    classifier: Arc<dyn ContentClassifier>,
}

impl fmt::Debug for ResumeRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumeRouter")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ResumeRouter {
    /// Creates a router with the default keyword classifier.
    #[must_use]
    pub fn new(policy: ResumePolicy) -> Self {
        Self {
            policy,
            classifier: Arc::new(KeywordClassifier::default()),
        }
    }

    /// Replaces the policy, keeping the classifier.
    #[must_use]
    pub fn with_policy(mut self, policy: ResumePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the classifier used by [`ResumePolicy::Heuristic`].
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn ContentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Returns the policy.
    #[must_use]
    pub fn policy(&self) -> ResumePolicy {
        self.policy
    }

    /// Routes `event` given the conversation's outstanding suspension.
    #[must_use]
    pub fn route(&self, suspension: Option<SuspendedCallRecord>, event: &InboundEvent) -> RouteDecision {
        let Some(record) = suspension else {
            return RouteDecision::Fresh {
                reason: FreshReason::NoSuspension,
            };
        };

        let expected = expected_channel(record.handler.kind());
        let received = event.channel();
        if expected != received {
            return RouteDecision::Fresh {
                reason: FreshReason::ChannelMismatch { expected, received },
            };
        }

        if let (ResumePolicy::Heuristic, Some(text)) = (self.policy, event.as_text())
            && !self.classifier.accepts(text, &record.handler)
        {
            return RouteDecision::Fresh {
                reason: FreshReason::NotClassifiedAsResponse,
            };
        }

        RouteDecision::Resume(record)
    }
}

impl Default for ResumeRouter {
    fn default() -> Self {
        Self::new(ResumePolicy::default())
    }
}
