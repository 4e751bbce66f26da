//! Call session lifecycle
//!
//! A session owns one call's dialogue and transport. States only move forward:
//! `Active -> TearingDown -> Closed`. Teardown runs once, in a fixed order:
//! publish the end-of-call event, close the transport, persist (if still pending),
//! send the confirmation.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    config::SessionConfig,
    dialogue::{CollectedRecord, DialogueEngine, Reply, TurnStatus},
    events::EventBroadcaster,
    fields::IntakeScript,
    notification::{MessageReceipt, NotificationConfig, NotificationError, NotificationGateway},
    prompts::Prompts,
    storage::StorageGateway,
    transport::{CallTransport, InboundCall},
    IntakeError,
};

/// Integration mistakes; these are bugs in the caller, not expected signals.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Transport already attached to call {0}")]
    AlreadyAttached(String),
    #[error("No transport attached to call {0}")]
    NotAttached(String),
    #[error("Call {0} was already opened")]
    AlreadyOpened(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Active,
    TearingDown,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
enum Persistence {
    Pending,
    Committed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StepOutcome {
    Completed,
    /// Already done earlier in the call
    AlreadyDone,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NotificationOutcome {
    Sent(MessageReceipt),
    Skipped(String),
    Failed(String),
}

/// What the teardown sequence did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub call_id: String,
    pub record_finished: bool,
    pub transport: StepOutcome,
    pub persistence: StepOutcome,
    pub notification: NotificationOutcome,
}

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct SessionDeps {
    pub script: Arc<IntakeScript>,
    pub prompts: Arc<Prompts>,
    pub storage: Arc<dyn StorageGateway>,
    pub notifier: Arc<dyn NotificationGateway>,
    pub events: EventBroadcaster,
    pub notification: Arc<NotificationConfig>,
    pub settings: SessionConfig,
}

struct SessionInner {
    state: SessionState,
    attached: bool,
    opened: bool,
    transport: Option<Box<dyn CallTransport>>,
    engine: DialogueEngine,
    persistence: Persistence,
}

pub struct CallSession {
    call: InboundCall,
    deps: SessionDeps,
    inner: Mutex<SessionInner>,
}

impl CallSession {
    pub fn new(call: InboundCall, deps: SessionDeps) -> Self {
        let engine = DialogueEngine::new(
            call.call_id.clone(),
            Arc::clone(&deps.script),
            Arc::clone(&deps.prompts),
        );

        Self {
            call,
            deps,
            inner: Mutex::new(SessionInner {
                state: SessionState::Active,
                attached: false,
                opened: false,
                transport: None,
                engine,
                persistence: Persistence::Pending,
            }),
        }
    }

    pub fn call(&self) -> &InboundCall {
        &self.call
    }

    pub fn call_id(&self) -> &str {
        &self.call.call_id
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn record(&self) -> CollectedRecord {
        self.inner.lock().await.engine.record().clone()
    }

    pub async fn remaining_fields(&self) -> usize {
        self.inner.lock().await.engine.cursor().remaining()
    }

    /// Bind the transport. Allowed exactly once per session.
    pub async fn attach(&self, transport: Box<dyn CallTransport>) -> Result<(), LifecycleError> {
        let mut inner = self.inner.lock().await;
        if inner.attached {
            error!("Call {}: transport attached twice", self.call.call_id);
            return Err(LifecycleError::AlreadyAttached(self.call.call_id.clone()));
        }
        inner.attached = true;
        inner.transport = Some(transport);
        debug!("Call {}: transport attached", self.call.call_id);
        Ok(())
    }

    /// Speak the opening prompt.
    pub async fn open(&self) -> Result<String, IntakeError> {
        let mut inner = self.inner.lock().await;
        if inner.opened {
            error!("Call {}: opened twice", self.call.call_id);
            return Err(LifecycleError::AlreadyOpened(self.call.call_id.clone()).into());
        }
        let reply = self.turn(&mut inner, "").await?;
        info!(
            "Call {} opened ({} -> {})",
            self.call.call_id, self.call.caller, self.call.called
        );
        self.deps
            .events
            .call_started(&self.call.call_id, &self.call.caller, &self.call.called);
        Ok(reply.prompt)
    }

    /// Process one recognised utterance. Returns `None` once teardown has begun.
    pub async fn handle_utterance(&self, text: &str) -> Result<Option<Reply>, IntakeError> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Active {
            debug!(
                "Call {}: ignoring utterance after hangup",
                self.call.call_id
            );
            return Ok(None);
        }
        self.turn(&mut inner, text).await.map(Some)
    }

    async fn turn(&self, inner: &mut SessionInner, text: &str) -> Result<Reply, IntakeError> {
        if inner.transport.is_none() {
            error!("Call {}: turn without a transport", self.call.call_id);
            return Err(LifecycleError::NotAttached(self.call.call_id.clone()).into());
        }

        let reply = inner.engine.respond(text)?;
        inner.opened = true;

        if reply.status == TurnStatus::Finished {
            info!("Call {}: all fields collected", self.call.call_id);
            self.deps.events.record_finished(&self.call.call_id);
            if self.deps.settings.persist_on_finish {
                self.persist(inner).await;
            }
        }

        if let Some(transport) = inner.transport.as_ref() {
            transport.speak(&reply.prompt).await?;
        }

        Ok(reply)
    }

    /// One attempt per session, whatever the outcome.
    async fn persist(&self, inner: &mut SessionInner) -> StepOutcome {
        if inner.persistence != Persistence::Pending {
            return StepOutcome::AlreadyDone;
        }

        let record = inner.engine.record();
        let script = &self.deps.script;
        let name = record.get(&script.contact_field).unwrap_or_default();
        let choice_value = record.get(&script.booking_field).unwrap_or_default();

        let result = self
            .deps
            .storage
            .persist(&self.call.call_id, name, choice_value)
            .await;

        match result {
            Ok(()) => {
                info!("Call {}: intake persisted", self.call.call_id);
                inner.persistence = Persistence::Committed;
                StepOutcome::Completed
            }
            Err(e) => {
                error!("Call {}: failed to persist intake: {}", self.call.call_id, e);
                inner.persistence = Persistence::Failed;
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    /// Run the teardown sequence. Repeated end-of-call signals return `None`.
    pub async fn on_end_of_call(&self) -> Option<TeardownReport> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Active {
            debug!(
                "Call {}: duplicate end-of-call signal ignored ({:?})",
                self.call.call_id, inner.state
            );
            return None;
        }
        inner.state = SessionState::TearingDown;

        let call_id = self.call.call_id.clone();
        let record_finished = inner.engine.record().is_finished();
        info!(
            "Call {} ended, tearing down (record finished: {})",
            call_id, record_finished
        );

        // 1. event
        self.deps.events.call_ended(&call_id, record_finished);

        // 2. streaming resources
        let transport = match inner.transport.take() {
            Some(transport) => match transport.close().await {
                Ok(()) => StepOutcome::Completed,
                Err(e) => {
                    warn!("Call {}: transport close failed: {}", call_id, e);
                    StepOutcome::Failed(e.to_string())
                }
            },
            None => StepOutcome::Skipped("no transport attached".to_string()),
        };

        // 3. persistence
        let persistence = if record_finished {
            self.persist(&mut inner).await
        } else {
            StepOutcome::Skipped("record not finished".to_string())
        };

        // 4. confirmation
        let notification = if !record_finished {
            info!(
                "Call {}: hung up before the intake was complete, no confirmation sent",
                call_id
            );
            NotificationOutcome::Skipped("record not finished".to_string())
        } else if inner.persistence != Persistence::Committed {
            warn!("Call {}: nothing persisted, no confirmation sent", call_id);
            NotificationOutcome::Skipped("record not persisted".to_string())
        } else {
            self.send_confirmation().await
        };

        inner.state = SessionState::Closed;
        info!("Call {} closed", call_id);

        Some(TeardownReport {
            call_id,
            record_finished,
            transport,
            persistence,
            notification,
        })
    }

    async fn send_confirmation(&self) -> NotificationOutcome {
        let call_id = &self.call.call_id;

        let stored = match self.deps.storage.retrieve(call_id).await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                warn!("Call {}: no stored intake to confirm", call_id);
                return NotificationOutcome::Skipped("no stored intake".to_string());
            }
            Err(e) => {
                error!("Call {}: failed to read back intake: {}", call_id, e);
                return NotificationOutcome::Failed(e.to_string());
            }
        };

        let message = match self.deps.notification.compose(&self.call, &stored) {
            Ok(message) => message,
            Err(e) => {
                error!("Call {}: cannot address confirmation: {}", call_id, e);
                return NotificationOutcome::Failed(e.to_string());
            }
        };

        let timeout_secs = self.deps.notification.timeout_secs;
        let sent = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.deps.notifier.send(&message),
        )
        .await
        .unwrap_or(Err(NotificationError::Timeout(timeout_secs)));

        match sent {
            Ok(receipt) => {
                info!(
                    "Call {}: confirmation {} sent to {}",
                    call_id, receipt.message_id, message.to
                );
                NotificationOutcome::Sent(receipt)
            }
            Err(e) => {
                error!("Call {}: confirmation failed: {}", call_id, e);
                NotificationOutcome::Failed(e.to_string())
            }
        }
    }
}
