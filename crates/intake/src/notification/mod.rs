//! Outbound confirmation messages
//!
//! One message per finished call, one attempt. Which number receives the confirmation
//! and which number it is sent from are configuration, resolved against the inbound leg.

pub mod twilio;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub use twilio::{TwilioConfig, TwilioSmsGateway};

use crate::{prompts::fill, storage::StoredIntake, transport::InboundCall};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification gateway not configured")]
    NotConfigured,

    #[error("No number available for {0}")]
    MissingNumber(&'static str),

    #[error("Message rejected by carrier ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Notification timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub from: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageReceipt {
    /// Carrier message id (e.g. a Twilio message SID)
    pub message_id: String,
    pub status: String,
    pub sent_at: DateTime<Utc>,
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<MessageReceipt, NotificationError>;
}

/// Where a phone number for the confirmation comes from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NumberSource {
    /// The party who placed the inbound call
    Caller,
    /// The number that was dialled (the service line)
    Called,
    /// A number fixed in configuration
    Fixed(String),
}

impl NumberSource {
    pub fn resolve<'a>(&'a self, call: &'a InboundCall) -> Option<&'a str> {
        let number = match self {
            NumberSource::Caller => call.caller.as_str(),
            NumberSource::Called => call.called.as_str(),
            NumberSource::Fixed(number) => number.as_str(),
        };
        let number = number.trim();
        (!number.is_empty()).then_some(number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationConfig {
    #[serde(default = "default_recipient")]
    pub recipient: NumberSource,
    #[serde(default = "default_sender")]
    pub sender: NumberSource,
    /// `{name}` and `{choice}` are substituted
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_recipient() -> NumberSource {
    NumberSource::Caller
}

fn default_sender() -> NumberSource {
    NumberSource::Called
}

fn default_template() -> String {
    "Hi {name}, your appointment is scheduled for {choice}.".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            recipient: default_recipient(),
            sender: default_sender(),
            template: default_template(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl NotificationConfig {
    pub fn render_body(&self, name: &str, choice: &str) -> String {
        fill(&self.template, &[("name", name), ("choice", choice)])
    }

    /// Build the confirmation for a stored intake on the given call.
    pub fn compose(
        &self,
        call: &InboundCall,
        stored: &StoredIntake,
    ) -> Result<OutboundMessage, NotificationError> {
        let to = self
            .recipient
            .resolve(call)
            .ok_or(NotificationError::MissingNumber("recipient"))?;
        let from = self
            .sender
            .resolve(call)
            .ok_or(NotificationError::MissingNumber("sender"))?;

        Ok(OutboundMessage {
            to: to.to_string(),
            from: from.to_string(),
            body: self.render_body(&stored.name, &stored.choice_value),
        })
    }
}

/// Writes the message to the log instead of sending it.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl NotificationGateway for LogNotifier {
    async fn send(&self, message: &OutboundMessage) -> Result<MessageReceipt, NotificationError> {
        info!(
            "SMS (not sent) from {} to {}: {}",
            message.from, message.to, message.body
        );
        Ok(MessageReceipt {
            message_id: format!("log-{}", Uuid::new_v4()),
            status: "logged".to_string(),
            sent_at: Utc::now(),
        })
    }
}
