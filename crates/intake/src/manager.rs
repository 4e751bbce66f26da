//! Registry of live call sessions
//!
//! Sessions are keyed by call id and share nothing mutable with each other; the
//! manager only hands out the shared collaborators.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{
    dialogue::Reply,
    session::{CallSession, SessionDeps, TeardownReport},
    transport::{CallTransport, InboundCall},
    IntakeError, Result,
};

pub struct CallManager {
    deps: SessionDeps,
    active_calls: Arc<RwLock<HashMap<String, Arc<CallSession>>>>,
}

impl CallManager {
    pub fn new(deps: SessionDeps) -> Self {
        Self {
            deps,
            active_calls: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn deps(&self) -> &SessionDeps {
        &self.deps
    }

    /// Create a session for an inbound call, attach its transport and speak the
    /// opening prompt.
    pub async fn start_call(
        &self,
        call: InboundCall,
        transport: Box<dyn CallTransport>,
    ) -> Result<String> {
        let call_id = call.call_id.clone();
        let session = Arc::new(CallSession::new(call, self.deps.clone()));

        {
            let mut calls = self.active_calls.write().await;
            if calls.contains_key(&call_id) {
                warn!("Call {} already has a session", call_id);
                return Err(IntakeError::CallExists(call_id));
            }
            calls.insert(call_id.clone(), Arc::clone(&session));
        }

        let opened = async {
            session.attach(transport).await?;
            session.open().await
        }
        .await;

        if opened.is_err() {
            self.active_calls.write().await.remove(&call_id);
        }
        opened
    }

    pub async fn session(&self, call_id: &str) -> Option<Arc<CallSession>> {
        self.active_calls.read().await.get(call_id).cloned()
    }

    pub async fn handle_utterance(&self, call_id: &str, text: &str) -> Result<Option<Reply>> {
        let session = self
            .session(call_id)
            .await
            .ok_or_else(|| IntakeError::CallNotFound(call_id.to_string()))?;
        session.handle_utterance(text).await
    }

    /// Tear the call down and forget it. A second signal for the same call is a no-op.
    pub async fn end_call(&self, call_id: &str) -> Option<TeardownReport> {
        let Some(session) = self.session(call_id).await else {
            info!("End of call for unknown or finished call {}", call_id);
            return None;
        };

        let report = session.on_end_of_call().await;
        self.active_calls.write().await.remove(call_id);
        report
    }

    pub async fn active_call_ids(&self) -> Vec<String> {
        self.active_calls.read().await.keys().cloned().collect()
    }
}
