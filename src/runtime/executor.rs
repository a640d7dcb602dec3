//! Per-identity session worker

use super::finalize::FinalizePipeline;
use super::traits::{ChatTransport, SessionStore};
use super::WorkerRegistry;
use crate::state_machine::{
    transition, ChatIdentity, Effect, Event, FormContext, SessionUpdate,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Serializes the events of one identity: each event is fully handled
/// (transition, store commit, effects) before the next one is received.
pub struct SessionWorker<S, T>
where
    S: SessionStore + 'static,
    T: ChatTransport + 'static,
{
    identity: ChatIdentity,
    context: Arc<FormContext>,
    store: Arc<S>,
    transport: Arc<T>,
    pipeline: Arc<FinalizePipeline>,
    event_rx: mpsc::UnboundedReceiver<Event>,
    idle_timeout: Duration,
    registry: WorkerRegistry,
}

impl<S, T> SessionWorker<S, T>
where
    S: SessionStore + 'static,
    T: ChatTransport + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: ChatIdentity,
        context: Arc<FormContext>,
        store: Arc<S>,
        transport: Arc<T>,
        pipeline: Arc<FinalizePipeline>,
        event_rx: mpsc::UnboundedReceiver<Event>,
        idle_timeout: Duration,
        registry: WorkerRegistry,
    ) -> Self {
        Self {
            identity,
            context,
            store,
            transport,
            pipeline,
            event_rx,
            idle_timeout,
            registry,
        }
    }

    pub async fn run(mut self) {
        tracing::debug!(identity = %self.identity, "Starting session worker");

        loop {
            match tokio::time::timeout(self.idle_timeout, self.event_rx.recv()).await {
                Ok(Some(event)) => self.process_event(event).await,
                Ok(None) => break,
                Err(_) => {
                    // Senders only deliver while holding the registry read lock,
                    // so with the write lock held the queue can no longer grow.
                    let mut workers = self.registry.write().await;
                    if let Ok(event) = self.event_rx.try_recv() {
                        drop(workers);
                        self.process_event(event).await;
                    } else {
                        workers.remove(&self.identity);
                        tracing::debug!(identity = %self.identity, "Session worker idle, exiting");
                        break;
                    }
                }
            }
        }

        tracing::debug!(identity = %self.identity, "Session worker stopped");
    }

    pub(crate) async fn process_event(&self, event: Event) {
        let kind = event.kind();
        let session = self.store.load(self.identity).await;
        let step = session.as_ref().map(|s| s.step);

        let result = match transition(session.as_ref(), self.identity, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(
                    identity = %self.identity,
                    event = kind,
                    error = %e,
                    "Event ignored"
                );
                return;
            }
        };

        // Commit before running effects so a repeated reply sees the new state
        match &result.update {
            SessionUpdate::Active(next) => {
                if step != Some(next.step) {
                    tracing::info!(
                        identity = %self.identity,
                        from = ?step,
                        to = %next.step,
                        "Session step changed"
                    );
                }
                self.store.save(next).await;
            }
            SessionUpdate::Finalized | SessionUpdate::Cleared => {
                tracing::info!(
                    identity = %self.identity,
                    outcome = ?result.update,
                    "Session closed"
                );
                self.store.remove(self.identity).await;
            }
        }

        for effect in result.effects {
            self.execute_effect(effect).await;
        }
    }

    async fn execute_effect(&self, effect: Effect) {
        match effect {
            Effect::Reply(message) => {
                if let Err(e) = self.transport.send(self.identity, message).await {
                    tracing::warn!(
                        identity = %self.identity,
                        error = %e,
                        "Failed to deliver reply"
                    );
                }
            }
            Effect::Finalize { submission } => {
                let report = self.pipeline.run(self.identity, submission).await;
                tracing::debug!(identity = %self.identity, report = ?report, "Finalize report");
            }
        }
    }
}
