//! Intent router backed by a capability agent.
//!
//! Classification is itself an opaque capability: the router delegates
//! to a designated agent and parses its JSON verdict. A response that
//! fails to parse is an `InvalidResponse` — the coordination service
//! turns that into a structural failure, since no workflow can be chosen
//! without an intent.

use async_trait::async_trait;
use brainstem_core::{
    AgentError, AgentInput, CapabilityAgent, ConversationTurn, IntentClassification, IntentRouter,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// An `IntentRouter` that delegates to a capability agent.
pub struct ClassifierRouter {
    agent: Arc<dyn CapabilityAgent>,
    action: String,
}

/// The classifier agent's expected verdict payload.
#[derive(Deserialize)]
struct Verdict {
    intent: String,
    #[serde(default = "full_confidence")]
    confidence: u8,
}

fn full_confidence() -> u8 {
    100
}

impl ClassifierRouter {
    /// Create a router that sends `action` to the given agent.
    pub fn new(agent: Arc<dyn CapabilityAgent>, action: impl Into<String>) -> Self {
        Self {
            agent,
            action: action.into(),
        }
    }
}

#[async_trait]
impl IntentRouter for ClassifierRouter {
    async fn classify(
        &self,
        message: &str,
        history: &[ConversationTurn],
    ) -> std::result::Result<IntentClassification, AgentError> {
        let input = AgentInput {
            message: message.to_string(),
            history: history.to_vec(),
            state: serde_json::Value::Null,
        };

        let output = self.agent.invoke(&self.action, &input).await?;

        let verdict: Verdict = serde_json::from_str(&output.content).map_err(|e| {
            AgentError::InvalidResponse(format!(
                "classifier returned unparseable verdict: {e}"
            ))
        })?;

        let confidence = verdict.confidence.min(100);
        debug!(intent = %verdict.intent, confidence, "Intent classified");

        Ok(IntentClassification {
            intent: verdict.intent,
            confidence,
        })
    }
}
