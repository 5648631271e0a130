//! In-memory state store.
//!
//! Conversations and project state held in a `tokio::sync::RwLock`-guarded
//! map. An unknown conversation reads as empty rather than erroring: the
//! first request of a conversation has no history yet.

use async_trait::async_trait;
use brainstem_core::{ConversationTurn, ProjectState, StateDelta, StateError, StateStore};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Record {
    turns: Vec<ConversationTurn>,
    state: ProjectState,
}

/// In-memory `StateStore` backend.
#[derive(Default)]
pub struct InMemoryStateStore {
    records: RwLock<HashMap<String, Record>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a conversation with history and state. Test/dev helper.
    pub async fn seed(
        &self,
        conversation_id: &str,
        turns: Vec<ConversationTurn>,
        state: ProjectState,
    ) {
        let mut records = self.records.write().await;
        records.insert(conversation_id.to_string(), Record { turns, state });
    }

    /// Number of stored conversations.
    pub async fn conversation_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn history(
        &self,
        conversation_id: &str,
    ) -> std::result::Result<Vec<ConversationTurn>, StateError> {
        let records = self.records.read().await;
        Ok(records
            .get(conversation_id)
            .map(|r| r.turns.clone())
            .unwrap_or_default())
    }

    async fn project_state(
        &self,
        conversation_id: &str,
    ) -> std::result::Result<ProjectState, StateError> {
        let records = self.records.read().await;
        Ok(records
            .get(conversation_id)
            .map(|r| r.state.clone())
            .unwrap_or_default())
    }

    async fn apply(
        &self,
        conversation_id: &str,
        delta: StateDelta,
    ) -> std::result::Result<(), StateError> {
        if delta.is_empty() {
            return Ok(());
        }

        let mut records = self.records.write().await;
        let record = records.entry(conversation_id.to_string()).or_default();

        let appended = delta.turns.len();
        record.turns.extend(delta.turns);

        if let Some(patch) = delta.state_patch {
            merge_patch(&mut record.state.data, patch);
        }
        // Every applied delta bumps the revision so the fingerprint
        // changes and previously cached responses stop matching.
        record.state.revision += 1;

        debug!(
            conversation_id,
            appended,
            revision = record.state.revision,
            "Applied state delta"
        );
        Ok(())
    }
}

/// Shallow-merge `patch` into `target`. Objects merge key-by-key;
/// anything else replaces the target wholesale.
fn merge_patch(target: &mut serde_json::Value, patch: serde_json::Value) {
    match (target, patch) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                target_map.insert(key, value);
            }
        }
        (target, patch) => *target = patch,
    }
}
