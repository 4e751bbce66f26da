//! Tests for call sessions, teardown and the call manager

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::broadcast;
    use tokio_test::{assert_err, assert_ok};

    use crate::{
        config::SessionConfig,
        events::{CallEvent, EventBroadcaster},
        fields::{ChoiceOption, FieldSpec, IntakeScript},
        manager::CallManager,
        notification::{
            MessageReceipt, NotificationConfig, NotificationError, NotificationGateway,
            OutboundMessage,
        },
        prompts::Prompts,
        session::{
            CallSession, LifecycleError, NotificationOutcome, SessionDeps, SessionState,
            StepOutcome,
        },
        storage::{MemoryStorage, StorageError, StorageGateway, StoredIntake},
        transport::{CallTransport, InboundCall, TransportError},
        DialogueError, IntakeError, TurnStatus,
    };

    type Journal = Arc<Mutex<Vec<String>>>;

    fn note(journal: &Journal, entry: impl Into<String>) {
        journal.lock().unwrap().push(entry.into());
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    struct JournalTransport {
        journal: Journal,
        spoken: Arc<Mutex<Vec<String>>>,
        events: Option<Mutex<broadcast::Receiver<CallEvent>>>,
        fail_close: bool,
    }

    #[async_trait]
    impl CallTransport for JournalTransport {
        async fn speak(&self, prompt: &str) -> Result<(), TransportError> {
            self.spoken.lock().unwrap().push(prompt.to_string());
            Ok(())
        }

        async fn close(&self) -> Result<(), TransportError> {
            if let Some(rx) = &self.events {
                let mut rx = rx.lock().unwrap();
                while let Ok(event) = rx.try_recv() {
                    if let CallEvent::CallEnded { .. } = event {
                        note(&self.journal, "event");
                    }
                }
            }
            note(&self.journal, "close");
            if self.fail_close {
                return Err(TransportError::Io("socket already gone".into()));
            }
            Ok(())
        }
    }

    struct JournalStorage {
        inner: MemoryStorage,
        journal: Journal,
        fail: bool,
    }

    #[async_trait]
    impl StorageGateway for JournalStorage {
        async fn persist(
            &self,
            call_id: &str,
            name: &str,
            choice_value: &str,
        ) -> Result<(), StorageError> {
            note(&self.journal, "persist");
            if self.fail {
                return Err(StorageError::Unavailable("disk full".into()));
            }
            self.inner.persist(call_id, name, choice_value).await
        }

        async fn retrieve(&self, call_id: &str) -> Result<Option<StoredIntake>, StorageError> {
            note(&self.journal, "retrieve");
            self.inner.retrieve(call_id).await
        }
    }

    struct JournalNotifier {
        journal: Journal,
        sent: Arc<Mutex<Vec<OutboundMessage>>>,
        delay: Option<Duration>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationGateway for JournalNotifier {
        async fn send(
            &self,
            message: &OutboundMessage,
        ) -> Result<MessageReceipt, NotificationError> {
            note(&self.journal, "send");
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(NotificationError::Rejected {
                    status: 400,
                    body: "invalid number".into(),
                });
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(MessageReceipt {
                message_id: "SM-test".into(),
                status: "queued".into(),
                sent_at: Utc::now(),
            })
        }
    }

    struct Harness {
        journal: Journal,
        spoken: Arc<Mutex<Vec<String>>>,
        sent: Arc<Mutex<Vec<OutboundMessage>>>,
        storage: Arc<JournalStorage>,
        deps: SessionDeps,
    }

    #[derive(Default)]
    struct Options {
        persist_on_finish: Option<bool>,
        storage_fails: bool,
        notifier_fails: bool,
        notifier_delay: Option<Duration>,
        timeout_secs: Option<u64>,
    }

    fn two_field_script() -> IntakeScript {
        IntakeScript::new(
            vec![
                FieldSpec::free_text("first name"),
                FieldSpec::choice(
                    "appointment",
                    "appointment",
                    vec![
                        ChoiceOption::new("Mark Zuck", "2030-01-01 10:00:00"),
                        ChoiceOption::new("Bill Gates", "2040-01-02 11:00:00"),
                    ],
                ),
            ],
            "first name",
            "appointment",
        )
        .unwrap()
    }

    fn harness(options: Options) -> Harness {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let sent = Arc::new(Mutex::new(Vec::new()));
        let storage = Arc::new(JournalStorage {
            inner: MemoryStorage::new(),
            journal: journal.clone(),
            fail: options.storage_fails,
        });
        let notifier = Arc::new(JournalNotifier {
            journal: journal.clone(),
            sent: sent.clone(),
            delay: options.notifier_delay,
            fail: options.notifier_fails,
        });

        let mut notification = NotificationConfig::default();
        if let Some(secs) = options.timeout_secs {
            notification.timeout_secs = secs;
        }

        let deps = SessionDeps {
            script: Arc::new(two_field_script()),
            prompts: Arc::new(Prompts::default()),
            storage: storage.clone(),
            notifier,
            events: EventBroadcaster::new(),
            notification: Arc::new(notification),
            settings: SessionConfig {
                persist_on_finish: options.persist_on_finish.unwrap_or(true),
            },
        };

        Harness {
            journal,
            spoken: Arc::new(Mutex::new(Vec::new())),
            sent,
            storage,
            deps,
        }
    }

    impl Harness {
        fn transport(&self) -> Box<JournalTransport> {
            Box::new(JournalTransport {
                journal: self.journal.clone(),
                spoken: self.spoken.clone(),
                events: Some(Mutex::new(self.deps.events.subscribe())),
                fail_close: false,
            })
        }

        fn call(&self, call_id: &str) -> InboundCall {
            InboundCall::new(call_id, "+15551230001", "+15559870002")
        }

        async fn opened_session(&self, call_id: &str) -> CallSession {
            let session = CallSession::new(self.call(call_id), self.deps.clone());
            session.attach(self.transport()).await.unwrap();
            session.open().await.unwrap();
            session
        }

        async fn rows(&self, call_id: &str) -> usize {
            self.storage.inner.row_count(call_id).await
        }
    }

    #[tokio::test]
    async fn full_call_persists_once_and_texts_the_caller() {
        let h = harness(Options::default());
        let session = h.opened_session("call-1").await;

        session.handle_utterance("Ann").await.unwrap();
        let reply = session.handle_utterance("two").await.unwrap().unwrap();
        assert_eq!(reply.status, TurnStatus::Finished);
        assert_eq!(h.rows("call-1").await, 1, "persisted as soon as finished");

        let report = session.on_end_of_call().await.expect("first teardown runs");

        assert!(report.record_finished);
        assert_eq!(report.transport, StepOutcome::Completed);
        assert_eq!(report.persistence, StepOutcome::AlreadyDone);
        assert!(matches!(report.notification, NotificationOutcome::Sent(ref r) if r.message_id == "SM-test"));
        assert_eq!(session.state().await, SessionState::Closed);

        let sent = h.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "+15551230001");
        assert_eq!(sent[0].from, "+15559870002");
        assert_eq!(
            sent[0].body,
            "Hi Ann, your appointment is scheduled for Bill Gates: 2040-01-02 11:00:00."
        );

        let spoken = h.spoken.lock().unwrap().clone();
        assert_eq!(spoken.len(), 3);
        assert_eq!(spoken[0], "Please provide your first name.");
        assert_eq!(spoken[2], Prompts::default().finished());

        assert!(session.on_end_of_call().await.is_none());
        assert_eq!(h.rows("call-1").await, 1);
        assert_eq!(h.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn teardown_steps_run_in_fixed_order() {
        let h = harness(Options {
            persist_on_finish: Some(false),
            ..Default::default()
        });
        let session = h.opened_session("call-order").await;
        session.handle_utterance("Ann").await.unwrap();
        session.handle_utterance("1").await.unwrap();
        assert_eq!(h.rows("call-order").await, 0, "persistence deferred to teardown");

        let report = session.on_end_of_call().await.unwrap();

        assert_eq!(report.persistence, StepOutcome::Completed);
        assert_eq!(
            entries(&h.journal),
            vec!["event", "close", "persist", "retrieve", "send"]
        );
        assert_eq!(h.rows("call-order").await, 1);
    }

    #[tokio::test]
    async fn early_hangup_skips_persistence_and_confirmation() {
        let h = harness(Options::default());
        let session = h.opened_session("call-early").await;
        session.handle_utterance("Ann").await.unwrap();

        let report = session.on_end_of_call().await.unwrap();

        assert!(!report.record_finished);
        assert_eq!(report.transport, StepOutcome::Completed);
        assert!(matches!(report.persistence, StepOutcome::Skipped(_)));
        assert!(matches!(report.notification, NotificationOutcome::Skipped(_)));
        assert_eq!(h.rows("call-early").await, 0);
        assert!(h.sent.lock().unwrap().is_empty());
        assert_eq!(session.state().await, SessionState::Closed);
    }

    #[tokio::test]
    async fn concurrent_end_signals_tear_down_once() {
        let h = harness(Options::default());
        let session = Arc::new(h.opened_session("call-dup").await);
        session.handle_utterance("Ann").await.unwrap();
        session.handle_utterance("one").await.unwrap();

        let (a, b) = tokio::join!(session.on_end_of_call(), session.on_end_of_call());

        assert_eq!(a.is_some() as u8 + b.is_some() as u8, 1);
        assert_eq!(h.rows("call-dup").await, 1);
        assert_eq!(h.sent.lock().unwrap().len(), 1);
        let closes = entries(&h.journal)
            .into_iter()
            .filter(|e| e == "close")
            .count();
        assert_eq!(closes, 1);
    }

    #[tokio::test]
    async fn attaching_twice_or_opening_unattached_fails_fast() {
        let h = harness(Options::default());

        let unattached = CallSession::new(h.call("call-bare"), h.deps.clone());
        let err = unattached.open().await.unwrap_err();
        assert!(matches!(
            err,
            IntakeError::Lifecycle(LifecycleError::NotAttached(_))
        ));

        let session = CallSession::new(h.call("call-twice"), h.deps.clone());
        assert_ok!(session.attach(h.transport()).await);
        let err = assert_err!(session.attach(h.transport()).await);
        assert_eq!(err, LifecycleError::AlreadyAttached("call-twice".into()));

        session.open().await.unwrap();
        let err = session.open().await.unwrap_err();
        assert!(matches!(
            err,
            IntakeError::Lifecycle(LifecycleError::AlreadyOpened(_))
        ));
    }

    #[tokio::test]
    async fn storage_failure_is_logged_and_teardown_completes() {
        let h = harness(Options {
            storage_fails: true,
            ..Default::default()
        });
        let session = h.opened_session("call-nodb").await;
        session.handle_utterance("Ann").await.unwrap();
        let reply = session.handle_utterance("2").await.unwrap().unwrap();
        assert_eq!(reply.status, TurnStatus::Finished, "caller still hears the goodbye");

        let report = session.on_end_of_call().await.unwrap();

        // the failed attempt at finish is not retried
        assert_eq!(report.persistence, StepOutcome::AlreadyDone);
        assert!(matches!(report.notification, NotificationOutcome::Skipped(_)));
        assert_eq!(
            entries(&h.journal)
                .iter()
                .filter(|e| *e == "persist")
                .count(),
            1
        );
        assert_eq!(session.state().await, SessionState::Closed);
    }

    #[tokio::test]
    async fn notification_failure_keeps_persisted_row() {
        let h = harness(Options {
            notifier_fails: true,
            ..Default::default()
        });
        let session = h.opened_session("call-nosms").await;
        session.handle_utterance("Ann").await.unwrap();
        session.handle_utterance("2").await.unwrap();

        let report = session.on_end_of_call().await.unwrap();

        assert!(matches!(report.notification, NotificationOutcome::Failed(ref e) if e.contains("invalid number")));
        assert_eq!(h.rows("call-nosms").await, 1);
        assert_eq!(session.state().await, SessionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_notification_is_bounded_by_timeout() {
        let h = harness(Options {
            notifier_delay: Some(Duration::from_secs(60)),
            timeout_secs: Some(2),
            ..Default::default()
        });
        let session = h.opened_session("call-slow").await;
        session.handle_utterance("Ann").await.unwrap();
        session.handle_utterance("2").await.unwrap();

        let report = session.on_end_of_call().await.unwrap();

        assert!(matches!(report.notification, NotificationOutcome::Failed(ref e) if e.contains("timed out")));
        assert_eq!(session.state().await, SessionState::Closed);
    }

    #[tokio::test]
    async fn transport_close_failure_does_not_stop_teardown() {
        let h = harness(Options::default());
        let session = CallSession::new(h.call("call-sock"), h.deps.clone());
        session
            .attach(Box::new(JournalTransport {
                journal: h.journal.clone(),
                spoken: h.spoken.clone(),
                events: None,
                fail_close: true,
            }))
            .await
            .unwrap();
        session.open().await.unwrap();
        session.handle_utterance("Ann").await.unwrap();
        session.handle_utterance("1").await.unwrap();

        let report = session.on_end_of_call().await.unwrap();

        assert!(matches!(report.transport, StepOutcome::Failed(_)));
        assert!(matches!(report.notification, NotificationOutcome::Sent(_)));
    }

    #[tokio::test]
    async fn utterances_after_teardown_are_ignored() {
        let h = harness(Options::default());
        let session = h.opened_session("call-late").await;
        session.on_end_of_call().await.unwrap();

        let reply = session.handle_utterance("Ann").await.unwrap();

        assert!(reply.is_none());
        assert!(session.record().await.is_empty());
    }

    #[tokio::test]
    async fn utterance_after_finish_is_a_dialogue_error() {
        let h = harness(Options::default());
        let session = h.opened_session("call-extra").await;
        session.handle_utterance("Ann").await.unwrap();
        session.handle_utterance("1").await.unwrap();

        let err = session.handle_utterance("and another thing").await.unwrap_err();

        assert!(matches!(
            err,
            IntakeError::Dialogue(DialogueError::AlreadyFinished(_))
        ));
        assert_eq!(h.rows("call-extra").await, 1);
    }

    #[tokio::test]
    async fn rejected_choice_does_not_shrink_remaining() {
        let h = harness(Options::default());
        let session = h.opened_session("call-retry").await;
        session.handle_utterance("Ann").await.unwrap();
        assert_eq!(session.remaining_fields().await, 1);

        let reply = session.handle_utterance("seven").await.unwrap().unwrap();

        assert!(matches!(reply.status, TurnStatus::Rejected(_)));
        assert_eq!(session.remaining_fields().await, 1);
        assert_eq!(h.rows("call-retry").await, 0);
    }

    #[tokio::test]
    async fn manager_isolates_sessions_and_forgets_ended_calls() {
        let h = harness(Options::default());
        let manager = CallManager::new(h.deps.clone());
        let mut events = h.deps.events.subscribe();

        let opening = manager
            .start_call(h.call("call-a"), h.transport())
            .await
            .unwrap();
        assert_eq!(opening, "Please provide your first name.");
        manager
            .start_call(h.call("call-b"), h.transport())
            .await
            .unwrap();

        let duplicate = manager.start_call(h.call("call-a"), h.transport()).await;
        assert!(matches!(duplicate, Err(IntakeError::CallExists(id)) if id == "call-a"));

        manager.handle_utterance("call-a", "Ann").await.unwrap();
        manager.handle_utterance("call-b", "Bea").await.unwrap();
        manager.handle_utterance("call-a", "1").await.unwrap();

        let a = manager.session("call-a").await.unwrap().record().await;
        let b = manager.session("call-b").await.unwrap().record().await;
        assert_eq!(a.get("first name"), Some("Ann"));
        assert!(a.is_finished());
        assert_eq!(b.get("first name"), Some("Bea"));
        assert!(!b.is_finished());

        let mut ids = manager.active_call_ids().await;
        ids.sort();
        assert_eq!(ids, vec!["call-a", "call-b"]);

        let report = manager.end_call("call-a").await.unwrap();
        assert!(matches!(report.notification, NotificationOutcome::Sent(_)));
        assert!(manager.end_call("call-a").await.is_none());
        assert_eq!(manager.active_call_ids().await, vec!["call-b"]);

        let err = manager.handle_utterance("call-a", "late").await.unwrap_err();
        assert!(matches!(err, IntakeError::CallNotFound(_)));

        let first = events.recv().await.unwrap();
        assert!(matches!(first, CallEvent::CallStarted { ref call_id, .. } if call_id == "call-a"));
    }
}
