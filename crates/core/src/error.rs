//! Error types for the Brainstem domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Brainstem operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Structural errors (fatal, surfaced to the caller) ---
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    // --- Agent errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- State store errors ---
    #[error("State error: {0}")]
    State(#[from] StateError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Problems with the request itself or the workflow configuration.
///
/// These are the only failures surfaced to the caller: they abort a
/// request before (or instead of) execution. Everything an individual
/// agent does wrong is recovered into a failed step outcome instead.
#[derive(Debug, Clone, Error)]
pub enum StructuralError {
    #[error("No workflow registered for intent '{0}'")]
    UnknownIntent(String),

    #[error("Workflow '{workflow}' references unregistered agent '{agent}'")]
    UnknownAgent { workflow: String, agent: String },

    #[error("Workflow '{0}' has no steps")]
    EmptyWorkflow(String),

    #[error(
        "Condition on step '{step}' of workflow '{workflow}' references '{referenced}', \
         which is not an earlier step"
    )]
    InvalidConditionReference {
        workflow: String,
        step: String,
        referenced: String,
    },

    #[error("Duplicate workflow for intent '{0}'")]
    DuplicateIntent(String),

    #[error("Intent classification failed: {0}")]
    ClassificationFailed(String),

    #[error("Intent '{intent}' classified at confidence {confidence}, below floor {floor}")]
    LowConfidence {
        intent: String,
        confidence: u8,
        floor: u8,
    },
}

/// Failures of a single capability agent invocation.
///
/// Always recovered locally: a failing agent becomes a failed step
/// result and its batch siblings keep running.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("Agent request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Agent '{agent}' timed out after {timeout_ms}ms")]
    Timeout { agent: String, timeout_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Agent returned an unparseable response: {0}")]
    InvalidResponse(String),

    #[error("Agent not configured: {0}")]
    NotConfigured(String),
}

/// Failures of the external state store.
#[derive(Debug, Clone, Error)]
pub enum StateError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unknown conversation: {0}")]
    UnknownConversation(String),
}
