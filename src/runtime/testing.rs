//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::error::{
    LocalWriteError, NotifyError, RemoteWriteError, SinkError, TransportError, UploadError,
};
use super::finalize::SubmissionRecord;
use super::traits::*;
use crate::state_machine::{ChatIdentity, FileReference, OutboundMessage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock Chat Transport
// ============================================================================

/// Transport that records every outbound message
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ChatIdentity, OutboundMessage)>>,
    fail: bool,
}

#[allow(dead_code)]
impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose deliveries all fail (messages are still recorded)
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(ChatIdentity, OutboundMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_to(&self, identity: ChatIdentity) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| *to == identity)
            .map(|(_, message)| message.text)
            .collect()
    }

    /// Poll until at least `count` messages were sent, or panic after a second
    pub async fn wait_for(&self, count: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(1), async {
            while self.sent.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "expected {count} messages, got {:?}", self.sent());
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send(
        &self,
        identity: ChatIdentity,
        message: OutboundMessage,
    ) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push((identity, message));
        if self.fail {
            return Err(TransportError::Delivery("mock transport down".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Mock Uploader
// ============================================================================

/// Uploader returning a fixed link, or failing every call
pub struct MockUploader {
    link: Option<String>,
    calls: Mutex<Vec<(FileReference, String)>>,
}

impl MockUploader {
    pub fn returning(link: impl Into<String>) -> Self {
        Self {
            link: Some(link.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            link: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(FileReference, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResumeUploader for MockUploader {
    async fn upload(
        &self,
        file: &FileReference,
        display_name: &str,
    ) -> Result<String, UploadError> {
        self.calls
            .lock()
            .unwrap()
            .push((file.clone(), display_name.to_string()));
        self.link
            .clone()
            .ok_or_else(|| UploadError::RateLimited("mock quota exhausted".to_string()))
    }
}

// ============================================================================
// Mock Sink
// ============================================================================

enum SinkFailure {
    None,
    Local,
    Remote,
}

/// Sink that records appended rows, optionally failing every append
pub struct RecordingSink {
    name: &'static str,
    failure: SinkFailure,
    records: Mutex<Vec<SubmissionRecord>>,
    attempts: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingSink {
    fn with_failure(name: &'static str, failure: SinkFailure) -> Self {
        Self {
            name,
            failure,
            records: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn new(name: &'static str) -> Self {
        Self::with_failure(name, SinkFailure::None)
    }

    pub fn failing_local(name: &'static str) -> Self {
        Self::with_failure(name, SinkFailure::Local)
    }

    pub fn failing_remote(name: &'static str) -> Self {
        Self::with_failure(name, SinkFailure::Remote)
    }

    /// Successfully appended records
    pub fn records(&self) -> Vec<SubmissionRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionSink for RecordingSink {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            SinkFailure::None => {
                self.records.lock().unwrap().push(record.clone());
                Ok(())
            }
            SinkFailure::Local => Err(LocalWriteError::Task("mock disk full".to_string()).into()),
            SinkFailure::Remote => {
                Err(RemoteWriteError::Auth("mock credentials revoked".to_string()).into())
            }
        }
    }
}

// ============================================================================
// Mock Notifier
// ============================================================================

/// Notifier that records summaries, optionally failing every call
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(ChatIdentity, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<(ChatIdentity, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReviewerNotifier for RecordingNotifier {
    async fn notify(&self, reviewer: ChatIdentity, html: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Delivery("mock reviewer chat blocked".to_string()));
        }
        self.messages
            .lock()
            .unwrap()
            .push((reviewer, html.to_string()));
        Ok(())
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrases::Phrases;
    use crate::runtime::finalize::{Collaborators, FinalizePipeline};
    use crate::runtime::{SessionManager, SessionWorker};
    use crate::state_machine::{Event, FormContext, FormStep, Keyboard};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{mpsc, RwLock};

    const APPLICANT: ChatIdentity = ChatIdentity(100);
    const REVIEWER: ChatIdentity = ChatIdentity(999);

    struct TestRuntime {
        store: Arc<InMemorySessionStore>,
        transport: Arc<RecordingTransport>,
        uploader: Arc<MockUploader>,
        file_sink: Arc<RecordingSink>,
        sheet_sink: Arc<RecordingSink>,
        notifier: Arc<RecordingNotifier>,
        pipeline: Arc<FinalizePipeline>,
    }

    impl TestRuntime {
        fn new() -> Self {
            Self::with_uploader(MockUploader::returning("https://drive.test/cv"))
        }

        fn with_uploader(uploader: MockUploader) -> Self {
            let store = Arc::new(InMemorySessionStore::new());
            let transport = Arc::new(RecordingTransport::new());
            let uploader = Arc::new(uploader);
            let file_sink = Arc::new(RecordingSink::new("csv"));
            let sheet_sink = Arc::new(RecordingSink::new("sheets"));
            let notifier = Arc::new(RecordingNotifier::new());
            let pipeline = Arc::new(FinalizePipeline::new(
                Phrases::english(),
                REVIEWER,
                Collaborators {
                    uploader: uploader.clone(),
                    file_sink: file_sink.clone(),
                    sheet_sink: sheet_sink.clone(),
                    notifier: notifier.clone(),
                    transport: transport.clone(),
                },
            ));
            Self {
                store,
                transport,
                uploader,
                file_sink,
                sheet_sink,
                notifier,
                pipeline,
            }
        }

        fn worker(
            &self,
            identity: ChatIdentity,
        ) -> SessionWorker<InMemorySessionStore, RecordingTransport> {
            let (_tx, rx) = mpsc::unbounded_channel();
            SessionWorker::new(
                identity,
                Arc::new(FormContext::new(Phrases::english())),
                self.store.clone(),
                self.transport.clone(),
                self.pipeline.clone(),
                rx,
                Duration::from_mins(1),
                Arc::new(RwLock::new(HashMap::new())),
            )
        }

        fn manager(&self) -> SessionManager<InMemorySessionStore, RecordingTransport> {
            SessionManager::new(
                &FormContext::new(Phrases::english()),
                self.store.clone(),
                self.transport.clone(),
                self.pipeline.clone(),
            )
        }

        async fn step_of(&self, identity: ChatIdentity) -> Option<FormStep> {
            self.store.load(identity).await.map(|s| s.step)
        }
    }

    async fn feed(
        worker: &SessionWorker<InMemorySessionStore, RecordingTransport>,
        events: Vec<Event>,
    ) {
        for event in events {
            worker.process_event(event).await;
        }
    }

    fn happy_path_until_consent(resume: Event) -> Vec<Event> {
        vec![
            Event::Start,
            Event::text("Jane Doe"),
            Event::text("Engineer"),
            resume,
            Event::text("+1-555-0100"),
        ]
    }

    #[tokio::test]
    async fn test_full_intake_without_resume() {
        let rt = TestRuntime::new();
        let worker = rt.worker(APPLICANT);
        let mut events = happy_path_until_consent(Event::text("skip"));
        events.push(Event::text("Yes"));
        feed(&worker, events).await;

        let records = rt.file_sink.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.full_name, "Jane Doe");
        assert_eq!(record.positions, "Engineer");
        assert_eq!(record.contacts, "+1-555-0100");
        assert_eq!(record.resume_link, "not provided");
        assert_eq!(rt.sheet_sink.records(), records);
        assert!(rt.uploader.calls().is_empty());

        let notes = rt.notifier.messages();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].0, REVIEWER);
        assert!(notes[0].1.contains("Jane Doe"));

        let sent = rt.transport.sent();
        let (to, last) = sent.last().unwrap();
        assert_eq!(*to, APPLICANT);
        assert_eq!(last.text, Phrases::english().acknowledgment);
        assert_eq!(last.keyboard, Keyboard::Remove);

        assert_eq!(rt.step_of(APPLICANT).await, None);
    }

    #[tokio::test]
    async fn test_full_intake_with_resume_upload() {
        let rt = TestRuntime::new();
        let worker = rt.worker(APPLICANT);
        let file = FileReference::new("tg-file").with_file_name("cv.docx");
        let mut events = happy_path_until_consent(Event::document(file.clone()));
        events.push(Event::text("yes"));
        feed(&worker, events).await;

        assert_eq!(rt.uploader.calls(), vec![(file, "Jane Doe".to_string())]);
        assert_eq!(rt.file_sink.records()[0].resume_link, "https://drive.test/cv");
    }

    #[tokio::test]
    async fn test_upload_failure_still_completes_intake() {
        let rt = TestRuntime::with_uploader(MockUploader::failing());
        let worker = rt.worker(APPLICANT);
        let mut events = happy_path_until_consent(Event::document(FileReference::new("f")));
        events.push(Event::text("yes"));
        feed(&worker, events).await;

        assert_eq!(rt.file_sink.records()[0].resume_link, "not provided");
        assert_eq!(rt.notifier.messages().len(), 1);
        assert_eq!(
            rt.transport.texts_to(APPLICANT).last().map(String::as_str),
            Some(Phrases::english().acknowledgment)
        );
    }

    #[tokio::test]
    async fn test_declined_then_granted_matches_direct_consent() {
        let rt = TestRuntime::new();
        let worker = rt.worker(APPLICANT);
        let mut events = happy_path_until_consent(Event::text("skip"));
        events.push(Event::text("No"));
        feed(&worker, events).await;
        assert_eq!(rt.step_of(APPLICANT).await, Some(FormStep::AwaitingPostConsentChoice));
        assert!(rt.file_sink.records().is_empty());

        let (_, prompt) = rt.transport.sent().last().unwrap().clone();
        assert_eq!(
            prompt.keyboard,
            Keyboard::Options(vec![
                vec!["Grant consent".to_string()],
                vec!["Delete my data".to_string()],
            ])
        );

        feed(&worker, vec![Event::text("Grant consent")]).await;
        let record = &rt.file_sink.records()[0];
        assert_eq!(record.full_name, "Jane Doe");
        assert_eq!(record.resume_link, "not provided");
        assert_eq!(rt.notifier.messages().len(), 1);
        assert_eq!(rt.step_of(APPLICANT).await, None);

        // Same closing message as a direct "yes"
        let (to, ack) = rt.transport.sent().last().unwrap().clone();
        assert_eq!(to, APPLICANT);
        assert_eq!(ack.text, Phrases::english().acknowledgment);
        assert_eq!(ack.keyboard, Keyboard::Remove);
    }

    #[tokio::test]
    async fn test_delete_my_data_has_no_side_effects() {
        let rt = TestRuntime::new();
        let worker = rt.worker(APPLICANT);
        let mut events = happy_path_until_consent(Event::text("skip"));
        events.push(Event::text("no"));
        events.push(Event::text("delete my data"));
        feed(&worker, events).await;

        assert_eq!(rt.file_sink.attempts(), 0);
        assert_eq!(rt.sheet_sink.attempts(), 0);
        assert!(rt.notifier.messages().is_empty());
        assert_eq!(rt.step_of(APPLICANT).await, None);
        assert_eq!(
            rt.transport.texts_to(APPLICANT).last().map(String::as_str),
            Some(Phrases::english().data_deleted)
        );
    }

    #[tokio::test]
    async fn test_repeated_consent_finalizes_once() {
        let rt = TestRuntime::new();
        let worker = rt.worker(APPLICANT);
        let mut events = happy_path_until_consent(Event::text("skip"));
        events.push(Event::text("yes"));
        events.push(Event::text("yes"));
        feed(&worker, events).await;

        assert_eq!(rt.file_sink.attempts(), 1);
        assert_eq!(rt.sheet_sink.attempts(), 1);
        assert_eq!(rt.notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_text_before_start_is_ignored() {
        let rt = TestRuntime::new();
        let worker = rt.worker(APPLICANT);
        feed(&worker, vec![Event::text("hello"), Event::text("yes")]).await;

        assert!(rt.transport.sent().is_empty());
        assert_eq!(rt.step_of(APPLICANT).await, None);
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_stall_form() {
        let mut rt = TestRuntime::new();
        rt.transport = Arc::new(RecordingTransport::failing());
        let worker = rt.worker(APPLICANT);
        feed(&worker, vec![Event::Start, Event::text("Jane Doe")]).await;

        assert_eq!(rt.step_of(APPLICANT).await, Some(FormStep::CollectingPositions));
        assert_eq!(rt.transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_manager_routes_identities_independently() {
        let rt = TestRuntime::new();
        let manager = rt.manager();
        let other = ChatIdentity(200);

        manager.send_event(APPLICANT, Event::Start).await.unwrap();
        manager.send_event(other, Event::Start).await.unwrap();
        manager.send_event(APPLICANT, Event::text("Jane Doe")).await.unwrap();
        rt.transport.wait_for(3).await;

        assert_eq!(manager.active_workers().await, 2);
        assert_eq!(rt.step_of(APPLICANT).await, Some(FormStep::CollectingPositions));
        assert_eq!(rt.step_of(other).await, Some(FormStep::CollectingName));
        assert_eq!(
            rt.transport.texts_to(APPLICANT),
            vec![
                Phrases::english().greeting.to_string(),
                Phrases::english().ask_positions.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_manager_preserves_event_order() {
        let rt = TestRuntime::new();
        let manager = rt.manager();
        for event in happy_path_until_consent(Event::text("skip")) {
            manager.send_event(APPLICANT, event).await.unwrap();
        }
        rt.transport.wait_for(5).await;

        let session = rt.store.load(APPLICANT).await.unwrap();
        assert_eq!(session.step, FormStep::AwaitingConsent);
        assert_eq!(session.fields.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(session.fields.contacts.as_deref(), Some("+1-555-0100"));
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_live_worker() {
        let rt = TestRuntime::new();
        let manager = rt.manager();

        let first = manager.get_or_create(APPLICANT).await;
        let second = manager.get_or_create(APPLICANT).await;
        assert!(first.event_tx.same_channel(&second.event_tx));
        assert_eq!(manager.active_workers().await, 1);
    }

    #[tokio::test]
    async fn test_idle_worker_exits_and_is_respawned() {
        let rt = TestRuntime::new();
        let manager = rt.manager().with_idle_timeout(Duration::from_millis(20));

        manager.send_event(APPLICANT, Event::Start).await.unwrap();
        rt.transport.wait_for(1).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(manager.active_workers().await, 0);

        // Session state lives in the store, so a fresh worker picks it up
        manager.send_event(APPLICANT, Event::text("Jane Doe")).await.unwrap();
        rt.transport.wait_for(2).await;
        assert_eq!(rt.step_of(APPLICANT).await, Some(FormStep::CollectingPositions));
    }
}
