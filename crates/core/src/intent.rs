//! IntentRouter trait — classification of raw input to a workflow intent.
//!
//! Classification itself is an opaque external capability; the engine
//! only depends on this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::turn::ConversationTurn;

/// The router's verdict for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentClassification {
    /// The classified intent identifier (e.g. "deciding", "exploring").
    pub intent: String,

    /// Confidence in the classification, 0–100.
    pub confidence: u8,
}

/// Classifies raw input against conversation context.
#[async_trait]
pub trait IntentRouter: Send + Sync {
    /// Classify `message` given the recent conversation history.
    async fn classify(
        &self,
        message: &str,
        history: &[ConversationTurn],
    ) -> std::result::Result<IntentClassification, AgentError>;
}
