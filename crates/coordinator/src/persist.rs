//! Fire-and-forget persistence.
//!
//! Request flows enqueue state deltas on a bounded channel; a background
//! worker drains it and applies each delta to the state store. Nothing
//! here ever surfaces to a caller: a full queue drops the delta with a
//! warning, a failed write is logged and forgotten.

use brainstem_core::{StateDelta, StateStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A queued write.
struct PersistJob {
    conversation_id: String,
    delta: StateDelta,
}

/// Handle for enqueueing best-effort writes.
#[derive(Clone)]
pub struct PersistQueue {
    tx: mpsc::Sender<PersistJob>,
}

impl PersistQueue {
    /// Start the background worker. Returns the enqueue handle and the
    /// worker's join handle; the worker exits once every handle is
    /// dropped and the queue drains.
    pub fn start(
        store: Arc<dyn StateStore>,
        capacity: usize,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<PersistJob>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match store.apply(&job.conversation_id, job.delta).await {
                    Ok(()) => {
                        debug!(conversation_id = %job.conversation_id, "Persisted state delta")
                    }
                    Err(e) => {
                        warn!(
                            conversation_id = %job.conversation_id,
                            error = %e,
                            "Best-effort persistence failed"
                        );
                    }
                }
            }
            debug!("Persistence worker stopped");
        });

        (Self { tx }, handle)
    }

    /// Enqueue a delta. Never blocks and never fails the caller.
    pub fn enqueue(&self, conversation_id: &str, delta: StateDelta) {
        if delta.is_empty() {
            return;
        }
        let job = PersistJob {
            conversation_id: conversation_id.to_string(),
            delta,
        };
        if let Err(e) = self.tx.try_send(job) {
            warn!(error = %e, "Persistence queue full or closed, dropping delta");
        }
    }
}
