//! Handlers describe what external input a suspended function is waiting on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of external interaction needed to resume a suspended function.
///
/// Handlers are immutable once created; a function that needs a different
/// interaction on its next step returns a new handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Handler {
    /// Ask the user a free-text question.
    AskUser { question: String },
    /// Ask for an approve/deny decision.
    GetApproval { prompt: String },
    /// Ask the user to pick one of a fixed set of options.
    SelectFromOptions {
        question: String,
        options: Vec<String>,
    },
    /// Wait for an external system to call back.
    Webhook { url: String },
    /// Wait for a delay to elapse.
    Timer { delay_seconds: u64, message: String },
}

impl Handler {
    /// Creates an ask-user handler.
    #[must_use]
    pub fn ask_user(question: impl Into<String>) -> Self {
        Self::AskUser {
            question: question.into(),
        }
    }

    /// Creates an approval handler.
    #[must_use]
    pub fn get_approval(prompt: impl Into<String>) -> Self {
        Self::GetApproval {
            prompt: prompt.into(),
        }
    }

    /// Creates an option-selection handler.
    #[must_use]
    pub fn select_from_options<I, S>(question: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::SelectFromOptions {
            question: question.into(),
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a webhook handler.
    #[must_use]
    pub fn webhook(url: impl Into<String>) -> Self {
        Self::Webhook { url: url.into() }
    }

    /// Creates a timer handler.
    #[must_use]
    pub fn timer(delay_seconds: u64, message: impl Into<String>) -> Self {
        Self::Timer {
            delay_seconds,
            message: message.into(),
        }
    }

    /// Returns the kind of this handler.
    #[must_use]
    pub fn kind(&self) -> HandlerKind {
        match self {
            Self::AskUser { .. } => HandlerKind::AskUser,
            Self::GetApproval { .. } => HandlerKind::GetApproval,
            Self::SelectFromOptions { .. } => HandlerKind::SelectFromOptions,
            Self::Webhook { .. } => HandlerKind::Webhook,
            Self::Timer { .. } => HandlerKind::Timer,
        }
    }

    /// Text a channel adapter can show while the suspension is outstanding.
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            Self::AskUser { question } => question.clone(),
            Self::GetApproval { prompt } => prompt.clone(),
            Self::SelectFromOptions { question, options } => {
                format!("{question} [{}]", options.join(", "))
            }
            Self::Webhook { url } => format!("Waiting for callback at {url}"),
            Self::Timer { message, .. } => message.clone(),
        }
    }
}

/// Discriminant of [`Handler`], without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    AskUser,
    GetApproval,
    SelectFromOptions,
    Webhook,
    Timer,
}

impl HandlerKind {
    /// Every handler kind.
    pub const ALL: [Self; 5] = [
        Self::AskUser,
        Self::GetApproval,
        Self::SelectFromOptions,
        Self::Webhook,
        Self::Timer,
    ];

    /// Returns the snake_case name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AskUser => "ask_user",
            Self::GetApproval => "get_approval",
            Self::SelectFromOptions => "select_from_options",
            Self::Webhook => "webhook",
            Self::Timer => "timer",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_kind_matches_variant() {
        assert_eq!(Handler::ask_user("Name?").kind(), HandlerKind::AskUser);
        assert_eq!(Handler::get_approval("Ok?").kind(), HandlerKind::GetApproval);
        assert_eq!(
            Handler::select_from_options("Size?", ["S", "M"]).kind(),
            HandlerKind::SelectFromOptions
        );
        assert_eq!(Handler::webhook("https://example.test/cb").kind(), HandlerKind::Webhook);
        assert_eq!(Handler::timer(30, "later").kind(), HandlerKind::Timer);
    }

    #[test]
    fn handler_serializes_with_kind_tag() {
        let json = serde_json::to_value(Handler::timer(60, "Check again")).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"kind": "timer", "delay_seconds": 60, "message": "Check again"})
        );
    }

    #[test]
    fn display_text_lists_options() {
        let handler = Handler::select_from_options("Pick a size", ["small", "large"]);
        assert_eq!(handler.display_text(), "Pick a size [small, large]");
    }

    #[test]
    fn kind_names_are_snake_case() {
        assert_eq!(HandlerKind::SelectFromOptions.to_string(), "select_from_options");
        assert_eq!(HandlerKind::ALL.len(), 5);
    }
}
