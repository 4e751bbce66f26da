//! # Intake - phone intake agent
//!
//! Collects a fixed sequence of fields from a caller one utterance at a time, stores the
//! finished intake and texts the caller a confirmation once they hang up. Audio,
//! transcription and synthesis stay on the far side of [`transport::CallTransport`].

pub mod config;
pub mod dialogue;
pub mod events;
pub mod fields;
pub mod manager;
pub mod notification;
pub mod ordinal;
pub mod prompts;
pub mod session;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod session_tests;

pub use config::{ConfigError, DatabaseConfig, IntakeConfig, SessionConfig};
pub use dialogue::{
    CollectedRecord, DialogueCursor, DialogueEngine, DialogueError, Reply, TurnStatus,
    ValidationError,
};
pub use events::{CallEvent, EventBroadcaster};
pub use fields::{ChoiceOption, FieldKind, FieldSpec, IntakeScript};
pub use manager::CallManager;
pub use notification::{
    LogNotifier, MessageReceipt, NotificationConfig, NotificationError, NotificationGateway,
    NumberSource, OutboundMessage, TwilioConfig, TwilioSmsGateway,
};
pub use ordinal::parse_cardinal;
pub use prompts::Prompts;
pub use session::{
    CallSession, LifecycleError, NotificationOutcome, SessionDeps, SessionState, StepOutcome,
    TeardownReport,
};
pub use storage::{MemoryStorage, SqliteStorage, StorageError, StorageGateway, StoredIntake};
pub use transport::{CallTransport, InboundCall, TransportError};

/// Main error type for intake operations
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Dialogue error: {0}")]
    Dialogue(#[from] DialogueError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Call not found: {0}")]
    CallNotFound(String),

    #[error("Call already in progress: {0}")]
    CallExists(String),
}

pub type Result<T> = std::result::Result<T, IntakeError>;
