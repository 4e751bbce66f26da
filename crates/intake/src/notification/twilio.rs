//! Twilio Messages API gateway

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{MessageReceipt, NotificationError, NotificationGateway, OutboundMessage};

const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Configuration for the Twilio SMS gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwilioConfig {
    /// Twilio Account SID
    pub account_sid: String,
    /// Twilio Auth Token
    pub auth_token: String,
    /// Twilio phone number (the service line callers dial)
    pub phone_number: String,
    /// REST API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_request_timeout() -> u64 {
    15
}

impl TwilioConfig {
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty()
    }

    /// Create config from environment variables
    pub fn from_env() -> Option<Self> {
        let account_sid = std::env::var("TWILIO_ACCOUNT_SID").ok()?;
        let auth_token = std::env::var("TWILIO_AUTH_TOKEN").ok()?;

        let get_env_or_default = |key: &str, default: String| -> String {
            std::env::var(key)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(default)
        };

        Some(Self {
            account_sid,
            auth_token,
            phone_number: get_env_or_default("TWILIO_PHONE_NUMBER", String::new()),
            api_base: get_env_or_default("TWILIO_API_BASE", default_api_base()),
            request_timeout_secs: std::env::var("TWILIO_REQUEST_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_request_timeout),
        })
    }

    pub fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
    status: Option<String>,
}

pub struct TwilioSmsGateway {
    config: TwilioConfig,
    client: reqwest::Client,
}

impl TwilioSmsGateway {
    pub fn new(config: TwilioConfig) -> Result<Self, NotificationError> {
        if !config.is_configured() {
            return Err(NotificationError::NotConfigured);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }
}

/// Form body of a Messages.json request.
pub(crate) fn message_form(message: &OutboundMessage) -> [(&'static str, &str); 3] {
    [
        ("To", message.to.as_str()),
        ("From", message.from.as_str()),
        ("Body", message.body.as_str()),
    ]
}

#[async_trait]
impl NotificationGateway for TwilioSmsGateway {
    async fn send(&self, message: &OutboundMessage) -> Result<MessageReceipt, NotificationError> {
        let response = self
            .client
            .post(self.config.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&message_form(message))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Twilio rejected SMS to {}: {} {}", message.to, status, body);
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TwilioMessageResponse =
            serde_json::from_str(&body).map_err(|e| NotificationError::Rejected {
                status: status.as_u16(),
                body: format!(
                    "unreadable response ({}): {}",
                    e,
                    body.chars().take(200).collect::<String>()
                ),
            })?;

        info!("Sent SMS {} to {}", parsed.sid, message.to);

        Ok(MessageReceipt {
            message_id: parsed.sid,
            status: parsed.status.unwrap_or_else(|| "queued".to_string()),
            sent_at: Utc::now(),
        })
    }
}
