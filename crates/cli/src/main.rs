//! Intake console
//!
//! Drives the phone intake agent from a terminal: each typed line stands in for one
//! transcribed utterance, prompts are printed instead of synthesized.

mod commands;
mod config;
mod output;
mod repl;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Phone intake console
#[derive(Parser)]
#[command(name = "intake")]
#[command(author = "Intake Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Simulate intake calls and inspect collected records")]
#[command(long_about = r#"
Runs the intake dialogue against the console. Prompts are printed, every line you type
is one caller utterance. Type /hangup (or Ctrl-D) to end the call; the record is stored
and the confirmation text is sent through Twilio when TWILIO_* is set, logged otherwise.

Examples:
  intake                              # Simulate a call with defaults
  intake call --caller +15551234567   # Simulate a call from a given number
  intake lookup call-1234             # Show what was stored for a call
  intake script                       # Show the configured questions
"#)]
struct Cli {
    /// Path to the config file (defaults to ~/.intake/config.toml)
    #[arg(short, long, env = "INTAKE_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database URL, overrides the config file
    #[arg(long, env = "INTAKE_DATABASE_URL")]
    database: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate an inbound call
    Call {
        /// Number the call comes from
        #[arg(long, env = "INTAKE_CALLER", default_value = commands::DEFAULT_CALLER)]
        caller: String,

        /// Number that was dialled (defaults to TWILIO_PHONE_NUMBER)
        #[arg(long)]
        called: Option<String>,

        /// Call id to use instead of a generated one
        #[arg(long)]
        call_id: Option<String>,
    },

    /// Show the stored intake for a call
    Lookup {
        call_id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the configured field sequence
    Script,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("intake={0},intake_cli={0},db={0},warn", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = config::load(cli.config.as_deref(), cli.database.as_deref())?;

    match cli.command {
        Some(Commands::Lookup { call_id, json }) => {
            commands::lookup(&config, &call_id, json).await?;
        }
        Some(Commands::Script) => {
            commands::show_script(&config);
        }
        Some(Commands::Call {
            caller,
            called,
            call_id,
        }) => {
            commands::simulate_call(&config, caller, called, call_id).await?;
        }
        None => {
            commands::simulate_call(&config, commands::DEFAULT_CALLER.to_string(), None, None)
                .await?;
        }
    }

    Ok(())
}
