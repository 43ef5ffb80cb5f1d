//! Console demo for the deferral engine.
//!
//! Runs one conversation against a keyword planner. Suspended functions wait
//! for `/action`, `/webhook` or typed replies; timer suspensions re-enter the
//! conversation on their own once the delay elapses.

mod config;
mod console;
mod error;
mod functions;
mod planner;

use crate::config::DemoConfig;
use crate::console::{Command, USAGE};
use crate::error::DemoError;
use crate::planner::KeywordPlanner;
use deferral_conversation::{InMemoryConversationMemory, InMemorySuspensionStore};
use deferral_core::ConversationId;
use deferral_engine::{
    ExecutionCoordinator, InboundChannel, InboundEvent, ListenerRegistration,
};
use rootcause::Report;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Report<DemoError>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,deferral_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = DemoConfig::from_env().map_err(|e| DemoError::Config {
        details: e.to_string(),
    })?;
    info!(max_depth = config.engine.max_depth, "loaded configuration");

    let registry = functions::registry(&config.expenses).map_err(|e| DemoError::Setup {
        details: e.to_string(),
    })?;
    let coordinator = Arc::new(
        ExecutionCoordinator::new(
            Arc::new(registry),
            Arc::new(InMemoryConversationMemory::new()),
            Arc::new(InMemorySuspensionStore::new()),
            Arc::new(KeywordPlanner::new()),
        )
        .with_config(config.engine),
    );

    let conversation_id = ConversationId::new();
    info!(%conversation_id, "conversation started");
    println!("{USAGE}\n");

    let (timer_tx, mut timer_rx) = mpsc::channel::<ListenerRegistration>(8);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let event = tokio::select! {
            line = lines.next_line() => {
                let line = line.map_err(|e| DemoError::Console { details: e.to_string() })?;
                let Some(line) = line else { break };
                match Command::parse(&line) {
                    Command::Event(event) => event,
                    Command::State => {
                        show_state(&coordinator, conversation_id).await;
                        continue;
                    }
                    Command::Abandon => {
                        match coordinator.abandon_suspension(conversation_id).await {
                            Ok(()) => println!("(suspension dropped)"),
                            Err(report) => println!("(could not drop suspension: {report})"),
                        }
                        continue;
                    }
                    Command::Help => {
                        println!("{USAGE}");
                        continue;
                    }
                    Command::Invalid(problem) => {
                        println!("({problem})");
                        continue;
                    }
                    Command::Empty => continue,
                    Command::Quit => break,
                }
            }
            Some(listener) = timer_rx.recv() => {
                if !still_waiting(&coordinator, &listener).await {
                    continue;
                }
                println!("(timer for {} elapsed)", listener.call_id);
                InboundEvent::TimerFired
            }
            _ = tokio::signal::ctrl_c() => break,
        };

        match coordinator.handle_turn(conversation_id, event).await {
            Ok(outcome) => {
                println!("assistant> {}", outcome.visible_text());
                if let Some(listener) = outcome.listener(conversation_id) {
                    arm(listener, &timer_tx);
                }
            }
            Err(report) => {
                error!(error = %report, "turn failed");
                println!("(turn failed: {report})");
            }
        }
    }

    info!(%conversation_id, "conversation ended");
    Ok(())
}

/// Arms whatever will eventually resume the suspended call.
fn arm(listener: ListenerRegistration, timers: &mpsc::Sender<ListenerRegistration>) {
    match listener.channel {
        InboundChannel::Timer => {
            let Some(delay) = listener.timer_delay else {
                return;
            };
            println!("(timer armed for {}s; /timer fires it early)", delay.as_secs());
            let timers = timers.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if timers.send(listener).await.is_err() {
                    tracing::debug!("console closed before timer fired");
                }
            });
        }
        InboundChannel::Webhook => {
            let url = listener.webhook_url.unwrap_or_default();
            println!("(waiting for a callback to {url}; simulate it with /webhook <json>)");
        }
        InboundChannel::Action => println!("(answer with /action <verb>)"),
        InboundChannel::Text => {}
    }
}

/// Returns true if the call a timer was armed for is still suspended.
async fn still_waiting(coordinator: &ExecutionCoordinator, listener: &ListenerRegistration) -> bool {
    coordinator
        .conversation_state(listener.conversation_id)
        .await
        .ok()
        .and_then(|state| state.suspension)
        .is_some_and(|record| record.call_id == listener.call_id)
}

async fn show_state(coordinator: &ExecutionCoordinator, conversation_id: ConversationId) {
    let state = match coordinator.conversation_state(conversation_id).await {
        Ok(state) => state,
        Err(report) => {
            println!("(could not load conversation: {report})");
            return;
        }
    };

    for message in &state.history {
        let calls: Vec<&str> = message
            .function_calls
            .iter()
            .map(|call| call.name.as_str())
            .collect();
        if calls.is_empty() {
            println!("  {:?}: {}", message.role, message.content);
        } else {
            println!("  {:?}: {} -> {}", message.role, message.content, calls.join(", "));
        }
    }
    match &state.suspension {
        Some(record) => println!(
            "  waiting: {} ({}) on {}",
            record.function_name,
            record.call_id,
            record.handler.kind()
        ),
        None => println!("  nothing suspended"),
    }
}
