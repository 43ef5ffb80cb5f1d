//! A keyword-driven stand-in for a language model.
//!
//! Picks a function call from words in the latest user message and turns
//! function results into a final answer. Enough to walk through every kind
//! of suspension from the console without a model provider.

use async_trait::async_trait;
use deferral_ai::{GenerateRequest, ModelGateway, ModelGatewayError, ModelReply};
use deferral_conversation::{FunctionCall, MessageRole};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const HELP: &str = "I can count words, file an expense, set a reminder, order lunch, \
                    book a meeting, wait for a payment or delete a report.";

/// Plans function calls from keywords.
#[derive(Debug, Default)]
pub struct KeywordPlanner {
    next_call: AtomicU64,
}

impl KeywordPlanner {
    /// Creates a planner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn call(&self, name: &str, arguments: serde_json::Value) -> ModelReply {
        let id = self.next_call.fetch_add(1, Ordering::Relaxed) + 1;
        ModelReply::call(FunctionCall::new(format!("call_{id}"), name, arguments))
    }

    fn plan(&self, text: &str) -> ModelReply {
        let lower = text.to_lowercase();
        let number = first_number(text);
        let rest = |keyword: &str| after_keyword(text, keyword).unwrap_or_default();

        if lower.contains("expense") {
            let doc = after_keyword(text, "for").unwrap_or_else(|| "Expense".to_string());
            self.call(
                "expense_approval",
                json!({ "amount": number.unwrap_or(0), "doc": doc }),
            )
        } else if lower.contains("remind") {
            self.call(
                "set_reminder",
                json!({ "seconds": number.unwrap_or(5), "message": rest("to") }),
            )
        } else if lower.contains("lunch") {
            self.call("order_lunch", json!({}))
        } else if lower.contains("meeting") {
            self.call("book_meeting", json!({ "topic": rest("about") }))
        } else if lower.contains("invoice") || lower.contains("payment") {
            self.call("await_payment", json!({ "invoice": last_word(text) }))
        } else if lower.contains("delete") {
            self.call("delete_report", json!({ "name": last_word(text) }))
        } else if lower.contains("count") {
            self.call("count_words", json!({ "text": rest("count") }))
        } else {
            ModelReply::terminal(HELP)
        }
    }
}

#[async_trait]
impl ModelGateway for KeywordPlanner {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelReply, ModelGatewayError> {
        let Some(last) = request.last_message() else {
            return Ok(ModelReply::terminal(HELP));
        };

        let reply = match (last.role, &last.function_result) {
            (MessageRole::Function, Some(result)) if result.is_failure => {
                ModelReply::terminal(format!("That didn't work. {}", result.content))
            }
            (MessageRole::Function, _) => ModelReply::terminal(format!("Done. {}", last.content)),
            (MessageRole::User, _) => self.plan(&last.content),
            _ => ModelReply::terminal(HELP),
        };
        debug!(reply = reply.content(), "planned reply");
        Ok(reply)
    }

    fn model(&self) -> &str {
        "keyword-planner"
    }
}

fn first_number(text: &str) -> Option<u64> {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())
        .and_then(|part| part.parse().ok())
}

fn after_keyword(text: &str, keyword: &str) -> Option<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let position = words
        .iter()
        .rposition(|word| word.eq_ignore_ascii_case(keyword))?;
    let rest = words[position + 1..].join(" ");
    let rest = rest.trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
    (!rest.is_empty()).then(|| rest.to_string())
}

fn last_word(text: &str) -> String {
    text.split_whitespace()
        .last()
        .unwrap_or_default()
        .trim_matches(|c: char| c.is_ascii_punctuation())
        .to_string()
}
