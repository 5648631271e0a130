//! CapabilityAgent trait — the abstraction over remote capability providers.
//!
//! An agent performs one input→output transformation, typically backed by
//! a remote, possibly non-deterministic call. The scheduler invokes
//! agents without knowing which backend is in play — pure polymorphism.
//!
//! Implementations: HTTP endpoints, scripted test agents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::turn::ConversationTurn;

/// Who may see a step's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Contributes to the user-facing reply.
    Public,
    /// Feeds later steps only; omitted from the reply.
    Internal,
}

/// The bounded input handed to one agent invocation.
///
/// `history` has already been pruned for this agent; the triggering
/// `message` and the `state` snapshot travel beside it and are never
/// subject to pruning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInput {
    /// The triggering user message.
    pub message: String,

    /// Pruned conversation history, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ConversationTurn>,

    /// Snapshot of the project state payload.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub state: serde_json::Value,
}

/// One agent invocation's result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    /// The produced content.
    pub content: String,

    /// Whether the content is user-facing or internal-only.
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,

    /// The agent's estimate of tokens consumed producing this output.
    #[serde(default)]
    pub estimated_tokens: u32,
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

impl AgentOutput {
    /// A public output with a token estimate.
    pub fn public(content: impl Into<String>, estimated_tokens: u32) -> Self {
        Self {
            content: content.into(),
            visibility: Visibility::Public,
            estimated_tokens,
        }
    }

    /// An internal-only output with a token estimate.
    pub fn internal(content: impl Into<String>, estimated_tokens: u32) -> Self {
        Self {
            content: content.into(),
            visibility: Visibility::Internal,
            estimated_tokens,
        }
    }
}

/// The core CapabilityAgent trait.
#[async_trait]
pub trait CapabilityAgent: Send + Sync {
    /// The agent's registered name (e.g. "reflect", "verify").
    fn name(&self) -> &str;

    /// Perform one action on the given bounded input.
    async fn invoke(
        &self,
        action: &str,
        input: &AgentInput,
    ) -> std::result::Result<AgentOutput, AgentError>;

    /// Health check — can we reach the agent?
    async fn health_check(&self) -> std::result::Result<bool, AgentError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_constructors() {
        let out = AgentOutput::public("risk summary", 120);
        assert_eq!(out.visibility, Visibility::Public);
        assert_eq!(out.estimated_tokens, 120);

        let out = AgentOutput::internal("scratchpad", 8);
        assert_eq!(out.visibility, Visibility::Internal);
    }

    #[test]
    fn visibility_defaults_to_public_on_deserialize() {
        let out: AgentOutput = serde_json::from_str(r#"{"content": "hello"}"#).unwrap();
        assert_eq!(out.visibility, Visibility::Public);
        assert_eq!(out.estimated_tokens, 0);
    }

    #[test]
    fn input_serialization_skips_empty_fields() {
        let input = AgentInput {
            message: "hi".into(),
            history: vec![],
            state: serde_json::Value::Null,
        };
        let json = serde_json::to_string(&input).unwrap();
        assert!(!json.contains("history"));
        assert!(!json.contains("state"));
    }
}
