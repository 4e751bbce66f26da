//! Console call loop
//!
//! Stands in for the audio pipeline: prompts go to stdout and every line read from the
//! terminal is delivered as one utterance.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use intake::{CallManager, CallTransport, InboundCall, TransportError, TurnStatus};
use rustyline::{error::ReadlineError, history::DefaultHistory, Editor};
use tracing::debug;

use crate::output::OutputHandler;

/// Transport that prints prompts to the terminal
#[derive(Debug, Default)]
pub struct ConsoleTransport {
    output: OutputHandler,
    closed: AtomicBool,
}

#[async_trait]
impl CallTransport for ConsoleTransport {
    async fn speak(&self, prompt: &str) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.output.print_prompt(prompt);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        debug!("Console transport closed");
        Ok(())
    }
}

/// What the user asked for on one line
#[derive(Debug, PartialEq, Eq)]
enum ConsoleInput<'a> {
    Utterance(&'a str),
    Hangup,
    Status,
    Help,
    Unknown(&'a str),
}

fn classify(line: &str) -> Option<ConsoleInput<'_>> {
    let input = line.trim();
    if input.is_empty() {
        return None;
    }
    let command = match input {
        "/hangup" | "/exit" | "/quit" => ConsoleInput::Hangup,
        "/status" => ConsoleInput::Status,
        "/help" => ConsoleInput::Help,
        other if other.starts_with('/') => ConsoleInput::Unknown(other),
        other => ConsoleInput::Utterance(other),
    };
    Some(command)
}

/// One simulated call
pub struct CallConsole {
    manager: CallManager,
    call: InboundCall,
    output: OutputHandler,
    editor: Editor<(), DefaultHistory>,
}

impl CallConsole {
    pub fn new(manager: CallManager, call: InboundCall) -> Result<Self> {
        Ok(Self {
            manager,
            call,
            output: OutputHandler::new(),
            editor: Editor::new()?,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut events = self.manager.deps().events.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                if let Ok(json) = serde_json::to_string(&event) {
                    debug!("Call event: {}", json);
                }
            }
        });

        self.output.print_banner(&self.call);
        let call_id = self.call.call_id.clone();
        self.manager
            .start_call(self.call.clone(), Box::new(ConsoleTransport::default()))
            .await?;

        loop {
            let line = match self.editor.readline(&format!("{} ", "caller>".bright_green())) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    println!();
                    self.output.print_info("Use /hangup to end the call.");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(e) => {
                    self.output.print_error(&format!("Input error: {}", e));
                    break;
                }
            };

            let Some(input) = classify(&line) else {
                continue;
            };
            let _ = self.editor.add_history_entry(line.trim());

            match input {
                ConsoleInput::Hangup => break,
                ConsoleInput::Help => {
                    self.output
                        .print_info("Answer the prompts. /status shows progress, /hangup ends the call.");
                }
                ConsoleInput::Status => self.print_status().await,
                ConsoleInput::Unknown(command) => {
                    self.output
                        .print_warning(&format!("Unknown command {}, try /help", command));
                }
                ConsoleInput::Utterance(text) => {
                    match self.manager.handle_utterance(&call_id, text).await {
                        Ok(Some(reply)) => {
                            if reply.status == TurnStatus::Finished {
                                self.output
                                    .print_info("Intake complete. /hangup to end the call.");
                            }
                        }
                        Ok(None) => break,
                        Err(e) => self.output.print_error(&e.to_string()),
                    }
                }
            }
        }

        match self.manager.end_call(&call_id).await {
            Some(report) => self.output.print_report(&report),
            None => self.output.print_warning("Call was already torn down"),
        }
        Ok(())
    }

    async fn print_status(&self) {
        let Some(session) = self.manager.session(&self.call.call_id).await else {
            self.output.print_warning("No active call");
            return;
        };
        let record = session.record().await;
        self.output.print_header("Collected so far");
        for (field, value) in record.values() {
            println!("  {} {}", format!("{}:", field).dimmed(), value);
        }
        self.output.print_info(&format!(
            "{} field(s) remaining",
            session.remaining_fields().await
        ));
    }
}
