//! Console command parsing.

use deferral_engine::InboundEvent;
use serde_json::Value as JsonValue;

/// Help shown by `/help`.
pub const USAGE: &str = "\
Type a message, or one of:
  /action <verb> [json]   send an action (approve, deny, an option name, ...)
  /webhook <json>         deliver a webhook payload
  /timer                  fire the timer now
  /state                  show history and the outstanding suspension
  /abandon                drop the outstanding suspension
  /quit                   exit";

/// One line of console input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Deliver an event to the conversation.
    Event(InboundEvent),
    State,
    Abandon,
    Help,
    Quit,
    /// Nothing to do.
    Empty,
    /// Input that could not be understood.
    Invalid(String),
}

impl Command {
    /// Parses one line of input.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Event(InboundEvent::text(line));
        };

        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        match name {
            "action" => parse_action(rest),
            "webhook" => match serde_json::from_str::<JsonValue>(rest) {
                Ok(payload) => Self::Event(InboundEvent::webhook(payload)),
                Err(e) => Self::Invalid(format!("webhook payload is not JSON: {e}")),
            },
            "timer" => Self::Event(InboundEvent::TimerFired),
            "state" => Self::State,
            "abandon" => Self::Abandon,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Invalid(format!("unknown command /{other}")),
        }
    }
}

fn parse_action(rest: &str) -> Command {
    let (verb, data) = match rest.split_once(char::is_whitespace) {
        Some((verb, data)) => (verb, data.trim()),
        None => (rest, ""),
    };
    if verb.is_empty() {
        return Command::Invalid("/action needs a verb".to_string());
    }
    if data.is_empty() {
        return Command::Event(InboundEvent::action(verb));
    }
    match serde_json::from_str::<JsonValue>(data) {
        Ok(data) => Command::Event(InboundEvent::action_with_data(verb, data)),
        Err(e) => Command::Invalid(format!("action data is not JSON: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_text_is_a_text_event() {
        assert_eq!(
            Command::parse("  book a meeting about hiring "),
            Command::Event(InboundEvent::text("book a meeting about hiring"))
        );
        assert_eq!(Command::parse("   "), Command::Empty);
    }

    #[test]
    fn actions() {
        assert_eq!(
            Command::parse("/action approve"),
            Command::Event(InboundEvent::action("approve"))
        );
        assert_eq!(
            Command::parse(r#"/action select {"option": "Pizza"}"#),
            Command::Event(InboundEvent::action_with_data(
                "select",
                json!({"option": "Pizza"})
            ))
        );
        assert!(matches!(Command::parse("/action"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/action select {oops"), Command::Invalid(_)));
    }

    #[test]
    fn webhooks_and_timers() {
        assert_eq!(
            Command::parse(r#"/webhook {"status": "paid"}"#),
            Command::Event(InboundEvent::webhook(json!({"status": "paid"})))
        );
        assert!(matches!(Command::parse("/webhook"), Command::Invalid(_)));
        assert_eq!(Command::parse("/timer"), Command::Event(InboundEvent::TimerFired));
    }

    #[test]
    fn console_commands() {
        assert_eq!(Command::parse("/state"), Command::State);
        assert_eq!(Command::parse("/abandon"), Command::Abandon);
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(
            Command::parse("/dance"),
            Command::Invalid("unknown command /dance".to_string())
        );
    }
}
