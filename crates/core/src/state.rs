//! External state store trait and the state fingerprint.
//!
//! The store owns conversation histories and per-conversation project
//! state. The engine reads both at the start of a request and writes
//! deltas back best-effort. The fingerprint is the freshness token for
//! the response cache: every applied delta bumps the revision, so any
//! mutation changes the fingerprint and stale cache entries simply stop
//! matching.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::StateError;
use crate::turn::ConversationTurn;

/// Opaque hash of externally observed mutable state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateFingerprint(pub String);

impl std::fmt::Display for StateFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Project state attached to a conversation.
///
/// The engine treats `data` as opaque JSON; only the revision counter is
/// its own. Serialization of `data` goes through `serde_json::Value`,
/// which keeps object keys in insertion order — combined with the
/// revision this makes the fingerprint deterministic per store state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectState {
    /// Monotonic revision, bumped on every applied delta.
    pub revision: u64,

    /// Opaque project payload (decisions, assumptions, open questions…).
    pub data: serde_json::Value,
}

impl ProjectState {
    /// An empty state at revision zero.
    pub fn empty() -> Self {
        Self {
            revision: 0,
            data: serde_json::Value::Null,
        }
    }

    /// Compute the freshness fingerprint for this state.
    pub fn fingerprint(&self) -> StateFingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.revision.to_be_bytes());
        hasher.update(self.data.to_string().as_bytes());
        StateFingerprint(format!("{:x}", hasher.finalize()))
    }
}

impl Default for ProjectState {
    fn default() -> Self {
        Self::empty()
    }
}

/// A best-effort write applied after a request completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDelta {
    /// Turns appended to the conversation history.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub turns: Vec<ConversationTurn>,

    /// Shallow patch merged into the project state payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_patch: Option<serde_json::Value>,
}

impl StateDelta {
    /// A delta that only appends turns.
    pub fn turns(turns: Vec<ConversationTurn>) -> Self {
        Self {
            turns,
            state_patch: None,
        }
    }

    /// Whether applying this delta would change anything.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty() && self.state_patch.is_none()
    }
}

/// The external state store.
///
/// History and project state are separate reads so callers with no
/// dependency between the two can fetch them concurrently.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// The backend name (e.g. "memory").
    fn name(&self) -> &str;

    /// Full conversation history, oldest first.
    async fn history(
        &self,
        conversation_id: &str,
    ) -> std::result::Result<Vec<ConversationTurn>, StateError>;

    /// Current project state for the conversation.
    async fn project_state(
        &self,
        conversation_id: &str,
    ) -> std::result::Result<ProjectState, StateError>;

    /// Apply a delta. Best-effort: callers log failures and move on.
    async fn apply(
        &self,
        conversation_id: &str,
        delta: StateDelta,
    ) -> std::result::Result<(), StateError>;
}
