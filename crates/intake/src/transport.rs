//! Boundary to the real-time audio pipeline
//!
//! Transcription and synthesis live outside this crate. A transport delivers the
//! prompts to be spoken and owns the streaming resources released at teardown.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport closed")]
    Closed,
    #[error("Transport I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

#[async_trait]
pub trait CallTransport: Send + Sync {
    /// Hand a prompt to the synthesizer.
    async fn speak(&self, prompt: &str) -> Result<(), TransportError>;

    /// Flush and release streaming resources. Called once, during teardown.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Identity of an inbound call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundCall {
    pub call_id: String,
    /// Number that placed the call
    pub caller: String,
    /// Number that was dialled
    pub called: String,
}

impl InboundCall {
    pub fn new(
        call_id: impl Into<String>,
        caller: impl Into<String>,
        called: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            caller: caller.into(),
            called: called.into(),
        }
    }

    /// Call with a freshly generated id.
    pub fn generate(caller: impl Into<String>, called: impl Into<String>) -> Self {
        Self::new(format!("call-{}", Uuid::new_v4()), caller, called)
    }
}
