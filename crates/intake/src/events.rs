//! Call lifecycle events
//!
//! Publication is fire-and-forget: a send with no subscribers is not an error and
//! nothing on the call path ever waits for a listener.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CallEvent {
    CallStarted {
        call_id: String,
        caller: String,
        called: String,
        timestamp: DateTime<Utc>,
    },
    /// Every field of the script has been collected
    RecordFinished {
        call_id: String,
        timestamp: DateTime<Utc>,
    },
    CallEnded {
        call_id: String,
        /// Whether the record was finished before hangup
        finished: bool,
        timestamp: DateTime<Utc>,
    },
}

impl CallEvent {
    pub fn call_id(&self) -> &str {
        match self {
            CallEvent::CallStarted { call_id, .. }
            | CallEvent::RecordFinished { call_id, .. }
            | CallEvent::CallEnded { call_id, .. } => call_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<CallEvent>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1000);
        Self { sender }
    }

    pub fn broadcast(&self, event: CallEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.sender.subscribe()
    }

    pub fn call_started(&self, call_id: &str, caller: &str, called: &str) {
        self.broadcast(CallEvent::CallStarted {
            call_id: call_id.to_string(),
            caller: caller.to_string(),
            called: called.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn record_finished(&self, call_id: &str) {
        self.broadcast(CallEvent::RecordFinished {
            call_id: call_id.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn call_ended(&self, call_id: &str, finished: bool) {
        self.broadcast(CallEvent::CallEnded {
            call_id: call_id.to_string(),
            finished,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_without_subscribers_is_silent() {
        let events = EventBroadcaster::new();
        events.call_ended("nobody-listening", false);
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let events = EventBroadcaster::new();
        let mut rx = events.subscribe();

        events.call_started("c1", "+15550001", "+15550002");
        events.call_ended("c1", true);

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, CallEvent::CallStarted { ref caller, .. } if caller == "+15550001"));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, CallEvent::CallEnded { finished: true, .. }));
        assert_eq!(second.call_id(), "c1");
    }
}
