//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the session worker and the finalize pipeline
//! with mock implementations.

use super::error::{NotifyError, SinkError, TransportError, UploadError};
use super::finalize::SubmissionRecord;
use crate::state_machine::{ChatIdentity, FileReference, OutboundMessage, Session};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Keyed storage of in-progress sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current session of an identity, if one is active
    async fn load(&self, identity: ChatIdentity) -> Option<Session>;

    /// Insert or replace the session of `session.identity`
    async fn save(&self, session: &Session);

    /// Drop the session of an identity, returning it if it existed
    async fn remove(&self, identity: ChatIdentity) -> Option<Session>;
}

/// Delivery of prompts and acknowledgments to applicants
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(
        &self,
        identity: ChatIdentity,
        message: OutboundMessage,
    ) -> Result<(), TransportError>;
}

/// A document opened for streaming
pub struct DocumentDownload {
    /// File name extension including the leading dot, when known
    pub extension: Option<String>,
    pub stream: BoxStream<'static, Result<Bytes, std::io::Error>>,
}

/// Resolves a [`FileReference`] to its content
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn open(&self, file: &FileReference) -> Result<DocumentDownload, UploadError>;
}

/// Stores a résumé and returns a shareable link to it
#[async_trait]
pub trait ResumeUploader: Send + Sync {
    async fn upload(&self, file: &FileReference, display_name: &str) -> Result<String, UploadError>;
}

/// Append-only destination for submission records
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError>;
}

/// Channel to the human reviewer
#[async_trait]
pub trait ReviewerNotifier: Send + Sync {
    /// Send an HTML formatted summary to `reviewer`
    async fn notify(&self, reviewer: ChatIdentity, html: &str) -> Result<(), NotifyError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn load(&self, identity: ChatIdentity) -> Option<Session> {
        (**self).load(identity).await
    }

    async fn save(&self, session: &Session) {
        (**self).save(session).await;
    }

    async fn remove(&self, identity: ChatIdentity) -> Option<Session> {
        (**self).remove(identity).await
    }
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn send(
        &self,
        identity: ChatIdentity,
        message: OutboundMessage,
    ) -> Result<(), TransportError> {
        (**self).send(identity, message).await
    }
}

#[async_trait]
impl<T: DocumentSource + ?Sized> DocumentSource for Arc<T> {
    async fn open(&self, file: &FileReference) -> Result<DocumentDownload, UploadError> {
        (**self).open(file).await
    }
}

#[async_trait]
impl<T: ResumeUploader + ?Sized> ResumeUploader for Arc<T> {
    async fn upload(
        &self,
        file: &FileReference,
        display_name: &str,
    ) -> Result<String, UploadError> {
        (**self).upload(file, display_name).await
    }
}

#[async_trait]
impl<T: SubmissionSink + ?Sized> SubmissionSink for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError> {
        (**self).append(record).await
    }
}

#[async_trait]
impl<T: ReviewerNotifier + ?Sized> ReviewerNotifier for Arc<T> {
    async fn notify(&self, reviewer: ChatIdentity, html: &str) -> Result<(), NotifyError> {
        (**self).notify(reviewer, html).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Process-local session store
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<ChatIdentity, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)] // Diagnostics and tests
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, identity: ChatIdentity) -> Option<Session> {
        self.sessions.lock().await.get(&identity).cloned()
    }

    async fn save(&self, session: &Session) {
        self.sessions
            .lock()
            .await
            .insert(session.identity, session.clone());
    }

    async fn remove(&self, identity: ChatIdentity) -> Option<Session> {
        self.sessions.lock().await.remove(&identity)
    }
}
