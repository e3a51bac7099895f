// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort event persistence.
//!
//! Every event is written in a detached task so output capture and the
//! processing pipeline never block on the store. Persistence may complete
//! out of order across events; consumers order by timestamp and event
//! type, never by write order. Failures go to stderr and are swallowed.

use drover_core::{AgentEvent, EventType, InstanceId};
use drover_store::IssueStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Inflight {
    count: AtomicUsize,
    drained: Notify,
}

/// Shared, stateless-per-event writer. Cloning is cheap; clones share the
/// in-flight accounting so `drain` covers all of them.
#[derive(Clone)]
pub struct EventWriter {
    store: Arc<dyn IssueStore>,
    executor_id: InstanceId,
    token: CancellationToken,
    inflight: Arc<Inflight>,
}

impl EventWriter {
    pub fn new(store: Arc<dyn IssueStore>, executor_id: InstanceId, token: CancellationToken) -> Self {
        Self {
            store,
            executor_id,
            token,
            inflight: Arc::new(Inflight::default()),
        }
    }

    pub fn executor_id(&self) -> &InstanceId {
        &self.executor_id
    }

    /// Start an event owned by this writer's executor instance.
    pub fn event(
        &self,
        event_type: EventType,
        issue_id: &str,
        message: impl Into<String>,
    ) -> AgentEvent {
        AgentEvent::new(event_type, issue_id, self.executor_id.clone(), message)
    }

    /// Fire-and-forget persistence. A cancelled context skips the write
    /// entirely; a failed write is logged and swallowed.
    pub fn emit(&self, event: AgentEvent) {
        if self.token.is_cancelled() {
            return;
        }
        self.inflight.count.fetch_add(1, Ordering::SeqCst);
        let store = Arc::clone(&self.store);
        let token = self.token.clone();
        let inflight = Arc::clone(&self.inflight);
        tokio::spawn(async move {
            if !token.is_cancelled() {
                if let Err(err) = store.store_agent_event(event).await {
                    eprintln!("warning: failed to persist agent event: {err}");
                }
            }
            if inflight.count.fetch_sub(1, Ordering::SeqCst) == 1 {
                inflight.drained.notify_waiters();
            }
        });
    }

    /// Wait for all outstanding writes. Used by shutdown so the tail of
    /// the event stream survives process exit.
    pub async fn drain(&self) {
        loop {
            let drained = self.inflight.drained.notified();
            if self.inflight.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            drained.await;
        }
    }

    /// Bounded channel that feeds received events into `emit`. Handed to
    /// the agent lifecycle so streamed tool-use events persist live.
    pub fn channel(&self, capacity: usize) -> mpsc::Sender<AgentEvent> {
        let (tx, mut rx) = mpsc::channel(capacity);
        let writer = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                writer.emit(event);
            }
        });
        tx
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
