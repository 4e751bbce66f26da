//! CLI subcommand handlers

use std::sync::Arc;

use anyhow::{Context, Result};
use intake::{
    CallManager, EventBroadcaster, InboundCall, IntakeConfig, LogNotifier, NotificationGateway,
    SessionDeps, SqliteStorage, StorageGateway, TwilioConfig, TwilioSmsGateway,
};
use tracing::info;

use crate::{output::OutputHandler, repl::CallConsole};

pub const DEFAULT_CALLER: &str = "+15555550100";

/// Used as the dialled number when neither `--called` nor `TWILIO_PHONE_NUMBER` is set
const FALLBACK_SERVICE_NUMBER: &str = "+15555550199";

/// Wire up storage and the SMS gateway. Also returns the Twilio number, if any.
pub async fn build_deps(config: &IntakeConfig) -> Result<(SessionDeps, Option<String>)> {
    let storage = SqliteStorage::connect(config.database.url.as_deref())
        .await
        .context("Failed to open the intake database")?;

    let (notifier, service_number): (Arc<dyn NotificationGateway>, Option<String>) =
        match TwilioConfig::from_env() {
            Some(twilio) if twilio.is_configured() => {
                let number = Some(twilio.phone_number.clone()).filter(|n| !n.is_empty());
                info!("Confirmations will be sent through Twilio");
                (Arc::new(TwilioSmsGateway::new(twilio)?), number)
            }
            _ => {
                info!("Twilio not configured, confirmations will only be logged");
                (Arc::new(LogNotifier), None)
            }
        };

    let deps = SessionDeps {
        script: Arc::new(config.script.clone()),
        prompts: Arc::new(config.prompts.clone()),
        storage: Arc::new(storage),
        notifier,
        events: EventBroadcaster::new(),
        notification: Arc::new(config.notification.clone()),
        settings: config.session.clone(),
    };

    Ok((deps, service_number))
}

/// Run one simulated call against the console
pub async fn simulate_call(
    config: &IntakeConfig,
    caller: String,
    called: Option<String>,
    call_id: Option<String>,
) -> Result<()> {
    let (deps, service_number) = build_deps(config).await?;

    let called = called
        .or(service_number)
        .unwrap_or_else(|| FALLBACK_SERVICE_NUMBER.to_string());
    let call = match call_id {
        Some(id) => InboundCall::new(id, caller, called),
        None => InboundCall::generate(caller, called),
    };

    let mut console = CallConsole::new(CallManager::new(deps), call)?;
    console.run().await
}

/// Show what was stored for a call
pub async fn lookup(config: &IntakeConfig, call_id: &str, json: bool) -> Result<()> {
    let storage = SqliteStorage::connect(config.database.url.as_deref())
        .await
        .context("Failed to open the intake database")?;
    let stored = storage.retrieve(call_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stored)?);
        return Ok(());
    }

    let output = OutputHandler::new();
    match stored {
        Some(stored) => output.print_stored(&stored),
        None => output.print_warning(&format!("No record for call {}", call_id)),
    }
    Ok(())
}

/// Show the configured field sequence
pub fn show_script(config: &IntakeConfig) {
    OutputHandler::new().print_script(&config.script);
}
