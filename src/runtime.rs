//! Runtime for executing intake sessions
//!
//! One worker task per applicant identity processes that identity's events in
//! arrival order. Workers for different identities run concurrently and exit
//! after a period of inactivity.

mod error;
mod executor;
pub mod finalize;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use error::{
    LocalWriteError, NotifyError, RemoteWriteError, SinkError, TransportError, UploadError,
};
pub use executor::SessionWorker;
pub use finalize::{Collaborators, FinalizePipeline, SubmissionRecord};
pub use traits::*;

use crate::state_machine::{ChatIdentity, Event, FormContext};
use crate::telegram::TelegramTransport;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

/// Type alias for the production manager with concrete implementations
pub type ProductionManager = SessionManager<InMemorySessionStore, TelegramTransport>;

/// How long a worker waits for the next event before shutting down
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_mins(10);

/// Live workers keyed by identity, shared between the manager and its workers
pub(crate) type WorkerRegistry = Arc<RwLock<HashMap<ChatIdentity, SessionHandle>>>;

/// Handle to a running session worker
#[derive(Clone)]
pub struct SessionHandle {
    pub event_tx: mpsc::UnboundedSender<Event>,
}

/// Routes inbound events to per-identity workers
pub struct SessionManager<S, T>
where
    S: SessionStore + 'static,
    T: ChatTransport + 'static,
{
    context: Arc<FormContext>,
    store: Arc<S>,
    transport: Arc<T>,
    pipeline: Arc<FinalizePipeline>,
    idle_timeout: Duration,
    workers: WorkerRegistry,
}

impl<S, T> SessionManager<S, T>
where
    S: SessionStore + 'static,
    T: ChatTransport + 'static,
{
    pub fn new(
        context: &FormContext,
        store: Arc<S>,
        transport: Arc<T>,
        pipeline: Arc<FinalizePipeline>,
    ) -> Self {
        Self {
            context: Arc::new(*context),
            store,
            transport,
            pipeline,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            workers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Get or create the worker for an identity
    #[allow(dead_code)] // Used by tests
    pub async fn get_or_create(&self, identity: ChatIdentity) -> SessionHandle {
        {
            let workers = self.workers.read().await;
            if let Some(handle) = workers.get(&identity) {
                if !handle.event_tx.is_closed() {
                    return handle.clone();
                }
            }
        }

        let mut workers = self.workers.write().await;
        self.ensure_worker(&mut workers, identity)
    }

    /// Send an event to the worker of `identity`, starting one if needed
    pub async fn send_event(&self, identity: ChatIdentity, event: Event) -> Result<(), String> {
        let mut event = event;

        {
            let workers = self.workers.read().await;
            if let Some(handle) = workers.get(&identity) {
                match handle.event_tx.send(event) {
                    Ok(()) => return Ok(()),
                    // Worker went away without deregistering; replace it below
                    Err(mpsc::error::SendError(returned)) => event = returned,
                }
            }
        }

        let mut workers = self.workers.write().await;
        let handle = self.ensure_worker(&mut workers, identity);
        handle
            .event_tx
            .send(event)
            .map_err(|e| format!("Failed to send event: {e}"))
    }

    /// Number of identities with a live worker
    #[allow(dead_code)] // Diagnostics and tests
    pub async fn active_workers(&self) -> usize {
        self.workers.read().await.len()
    }

    fn ensure_worker(
        &self,
        workers: &mut HashMap<ChatIdentity, SessionHandle>,
        identity: ChatIdentity,
    ) -> SessionHandle {
        if let Some(handle) = workers.get(&identity) {
            if !handle.event_tx.is_closed() {
                return handle.clone();
            }
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let worker = SessionWorker::new(
            identity,
            self.context.clone(),
            self.store.clone(),
            self.transport.clone(),
            self.pipeline.clone(),
            event_rx,
            self.idle_timeout,
            self.workers.clone(),
        );

        tokio::spawn(async move {
            worker.run().await;
        });

        let handle = SessionHandle { event_tx };
        workers.insert(identity, handle.clone());
        handle
    }
}
