//! Functions the demo assistant can call.
//!
//! One function per kind of external interaction, plus an ordinary function
//! and an approval-gated one.

use crate::config::ExpenseConfig;
use async_trait::async_trait;
use deferral_conversation::{DeferredState, Handler};
use deferral_engine::{
    ApprovalDecision, FunctionDescriptor, FunctionError, FunctionOutcome, FunctionRegistry,
    InboundEvent, RegistryError, SuspendableFunction, SyncFn, require_approval,
};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

/// Lunch options offered by `order_lunch`.
pub const LUNCH_OPTIONS: [&str; 3] = ["Pizza", "Salad", "Ramen"];

/// Builds the demo's function registry.
///
/// # Errors
///
/// Returns an error if a function cannot be registered.
pub fn registry(expenses: &ExpenseConfig) -> Result<FunctionRegistry, Report<RegistryError>> {
    FunctionRegistry::new()
        .with(count_words())?
        .with(expense_approval(expenses.director_threshold))?
        .with(set_reminder())?
        .with(order_lunch())?
        .with(book_meeting())?
        .with(await_payment())?
        .with(require_approval(
            delete_report(),
            "Permanently delete this report?",
        )?)
}

fn count_words() -> FunctionDescriptor {
    FunctionDescriptor::sync(
        "count_words",
        "Counts the words in a piece of text",
        SyncFn::new(|args| {
            let text = args["text"].as_str().unwrap_or_default();
            Ok(format!("{} words", text.split_whitespace().count()))
        }),
    )
    .with_parameters(json!({
        "type": "object",
        "properties": { "text": { "type": "string" } },
        "required": ["text"]
    }))
}

fn delete_report() -> FunctionDescriptor {
    FunctionDescriptor::sync(
        "delete_report",
        "Deletes a saved report",
        SyncFn::new(|args| match args["name"].as_str() {
            Some(name) if !name.trim().is_empty() => Ok(format!("report '{name}' deleted")),
            _ => Err(FunctionError::failed("report name is empty")),
        }),
    )
    .with_parameters(json!({
        "type": "object",
        "properties": { "name": { "type": "string" } },
        "required": ["name"]
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ApprovalStage {
    Manager,
    Director,
}

impl ApprovalStage {
    fn title(self) -> &'static str {
        match self {
            Self::Manager => "Manager",
            Self::Director => "Director",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ExpenseState {
    doc: String,
    amount: u64,
    stage: ApprovalStage,
}

impl ExpenseState {
    fn handler(&self) -> Handler {
        Handler::get_approval(format!(
            "{} approval needed for '{}' (${})",
            self.stage.title(),
            self.doc,
            self.amount
        ))
    }

    fn suspend(&self) -> Result<FunctionOutcome, FunctionError> {
        Ok(FunctionOutcome::deferred(
            DeferredState::encode(self)?,
            self.handler(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ExpenseArgs {
    doc: String,
    amount: u64,
}

/// Two-stage expense sign-off. Amounts above the threshold also go to a
/// director after the manager approves.
struct ExpenseApproval {
    director_threshold: u64,
}

#[async_trait]
impl SuspendableFunction for ExpenseApproval {
    async fn invoke(&self, arguments: &JsonValue) -> Result<FunctionOutcome, FunctionError> {
        let args: ExpenseArgs = serde_json::from_value(arguments.clone())
            .map_err(|e| FunctionError::failed(e.to_string()))?;
        ExpenseState {
            doc: args.doc,
            amount: args.amount,
            stage: ApprovalStage::Manager,
        }
        .suspend()
    }

    async fn resume(
        &self,
        input: &InboundEvent,
        state: DeferredState,
    ) -> Result<FunctionOutcome, FunctionError> {
        let mut expense: ExpenseState = state.decode()?;
        match ApprovalDecision::from_event(input) {
            Some(ApprovalDecision::Denied) => Ok(FunctionOutcome::completed(format!(
                "Expense '{}' rejected by the {}",
                expense.doc,
                expense.stage.title().to_lowercase()
            ))),
            Some(ApprovalDecision::Approved)
                if expense.stage == ApprovalStage::Manager
                    && expense.amount > self.director_threshold =>
            {
                expense.stage = ApprovalStage::Director;
                expense.suspend()
            }
            Some(ApprovalDecision::Approved) => Ok(FunctionOutcome::completed(format!(
                "Expense '{}' for ${} fully approved",
                expense.doc, expense.amount
            ))),
            None => Err(FunctionError::input_mismatch(
                "expected approve or deny for the expense",
            )),
        }
    }
}

fn expense_approval(director_threshold: u64) -> FunctionDescriptor {
    FunctionDescriptor::suspendable(
        "expense_approval",
        "Submits an expense for manager (and, above a threshold, director) approval",
        ExpenseApproval { director_threshold },
    )
    .with_parameters(json!({
        "type": "object",
        "properties": {
            "doc": { "type": "string" },
            "amount": { "type": "integer", "minimum": 1 }
        },
        "required": ["amount", "doc"]
    }))
}

#[derive(Debug, Serialize, Deserialize)]
struct Reminder {
    message: String,
}

struct SetReminder;

#[async_trait]
impl SuspendableFunction for SetReminder {
    async fn invoke(&self, arguments: &JsonValue) -> Result<FunctionOutcome, FunctionError> {
        let seconds = arguments["seconds"].as_u64().unwrap_or(5);
        let message = arguments["message"].as_str().unwrap_or("reminder").to_string();
        let state = DeferredState::encode(&Reminder {
            message: message.clone(),
        })?;
        Ok(FunctionOutcome::deferred(
            state,
            Handler::timer(seconds, message),
        ))
    }

    async fn resume(
        &self,
        input: &InboundEvent,
        state: DeferredState,
    ) -> Result<FunctionOutcome, FunctionError> {
        let reminder: Reminder = state.decode()?;
        match input {
            InboundEvent::TimerFired => Ok(FunctionOutcome::completed(format!(
                "Reminder delivered: {}",
                reminder.message
            ))),
            other => Err(FunctionError::input_mismatch(format!(
                "reminder waits on a timer, got {} input",
                other.channel()
            ))),
        }
    }
}

fn set_reminder() -> FunctionDescriptor {
    FunctionDescriptor::suspendable("set_reminder", "Reminds the user after a delay", SetReminder)
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "seconds": { "type": "integer", "minimum": 1 },
                "message": { "type": "string" }
            },
            "required": ["message"]
        }))
}

struct OrderLunch;

impl OrderLunch {
    fn choice(input: &InboundEvent) -> Option<&'static str> {
        let InboundEvent::Action { verb, data } = input else {
            return None;
        };
        let picked = match data.get("option").and_then(JsonValue::as_str) {
            Some(option) => option,
            None => verb.as_str(),
        };
        LUNCH_OPTIONS
            .into_iter()
            .find(|option| option.eq_ignore_ascii_case(picked.trim()))
    }
}

#[async_trait]
impl SuspendableFunction for OrderLunch {
    async fn invoke(&self, _arguments: &JsonValue) -> Result<FunctionOutcome, FunctionError> {
        Ok(FunctionOutcome::deferred(
            DeferredState::new(),
            Handler::select_from_options("What would you like for lunch?", LUNCH_OPTIONS),
        ))
    }

    async fn resume(
        &self,
        input: &InboundEvent,
        _state: DeferredState,
    ) -> Result<FunctionOutcome, FunctionError> {
        match Self::choice(input) {
            Some(option) => Ok(FunctionOutcome::completed(format!(
                "Lunch order placed: {option}"
            ))),
            None => Err(FunctionError::input_mismatch(format!(
                "expected one of {}",
                LUNCH_OPTIONS.join(", ")
            ))),
        }
    }
}

fn order_lunch() -> FunctionDescriptor {
    FunctionDescriptor::suspendable("order_lunch", "Orders lunch for the user", OrderLunch)
}

#[derive(Debug, Serialize, Deserialize)]
struct Meeting {
    topic: String,
}

struct BookMeeting;

#[async_trait]
impl SuspendableFunction for BookMeeting {
    async fn invoke(&self, arguments: &JsonValue) -> Result<FunctionOutcome, FunctionError> {
        let topic = arguments["topic"].as_str().unwrap_or("meeting").to_string();
        let question = format!("Which day works for '{topic}'?");
        Ok(FunctionOutcome::deferred(
            DeferredState::encode(&Meeting { topic })?,
            Handler::ask_user(question),
        ))
    }

    async fn resume(
        &self,
        input: &InboundEvent,
        state: DeferredState,
    ) -> Result<FunctionOutcome, FunctionError> {
        let meeting: Meeting = state.decode()?;
        match input.as_text().map(str::trim) {
            Some(day) if !day.is_empty() => Ok(FunctionOutcome::completed(format!(
                "Meeting '{}' booked for {day}",
                meeting.topic
            ))),
            _ => Err(FunctionError::input_mismatch("expected a day")),
        }
    }
}

fn book_meeting() -> FunctionDescriptor {
    FunctionDescriptor::suspendable("book_meeting", "Books a meeting on a day the user picks", BookMeeting)
        .with_parameters(json!({
            "type": "object",
            "properties": { "topic": { "type": "string" } },
            "required": ["topic"]
        }))
}

#[derive(Debug, Serialize, Deserialize)]
struct PendingPayment {
    invoice: String,
}

impl PendingPayment {
    fn handler(&self) -> Handler {
        Handler::webhook(format!(
            "https://hooks.example.com/payments/{}",
            self.invoice
        ))
    }
}

/// Waits for a payment provider callback. Callbacks other than `paid` or
/// `failed` keep the call waiting.
struct AwaitPayment;

#[async_trait]
impl SuspendableFunction for AwaitPayment {
    async fn invoke(&self, arguments: &JsonValue) -> Result<FunctionOutcome, FunctionError> {
        let pending = PendingPayment {
            invoice: arguments["invoice"].as_str().unwrap_or_default().to_string(),
        };
        Ok(FunctionOutcome::deferred(
            DeferredState::encode(&pending)?,
            pending.handler(),
        ))
    }

    async fn resume(
        &self,
        input: &InboundEvent,
        state: DeferredState,
    ) -> Result<FunctionOutcome, FunctionError> {
        let pending: PendingPayment = state.decode()?;
        let InboundEvent::Webhook { payload } = input else {
            return Err(FunctionError::input_mismatch("expected a payment callback"));
        };

        match payload.get("status").and_then(JsonValue::as_str) {
            Some("paid") => Ok(FunctionOutcome::completed(format!(
                "Invoice {} paid",
                pending.invoice
            ))),
            Some("failed") => Err(FunctionError::failed(format!(
                "payment for invoice {} failed",
                pending.invoice
            ))),
            _ => Ok(FunctionOutcome::deferred(
                DeferredState::encode(&pending)?,
                pending.handler(),
            )),
        }
    }
}

fn await_payment() -> FunctionDescriptor {
    FunctionDescriptor::suspendable(
        "await_payment",
        "Waits until an invoice is paid",
        AwaitPayment,
    )
    .with_parameters(json!({
        "type": "object",
        "properties": { "invoice": { "type": "string" } },
        "required": ["invoice"]
    }))
}
