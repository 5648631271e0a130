//! Scripted agents and routers for exercising the engine without any
//! remote collaborator. Used by this crate's tests and by downstream
//! crates wiring up test instances.

use async_trait::async_trait;
use brainstem_core::{
    AgentError, AgentInput, AgentOutput, CapabilityAgent, ConversationTurn, IntentClassification,
    IntentRouter,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What a scripted agent does on each call.
enum Behavior {
    /// Return the next response in the script; panic when exhausted.
    Script(Mutex<Vec<Result<AgentOutput, AgentError>>>),
    /// Return the same response on every call.
    Always(Result<AgentOutput, AgentError>),
    /// Sleep, then return the same response on every call.
    Slow(Duration, AgentOutput),
}

/// A capability agent with predetermined behavior.
pub struct ScriptedAgent {
    name: String,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl ScriptedAgent {
    /// Return the scripted responses in order; panics when more calls
    /// arrive than responses were provided.
    pub fn scripted(
        name: impl Into<String>,
        mut responses: Vec<Result<AgentOutput, AgentError>>,
    ) -> Self {
        responses.reverse();
        Self {
            name: name.into(),
            behavior: Behavior::Script(Mutex::new(responses)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Return the same output on every call.
    pub fn always(name: impl Into<String>, output: AgentOutput) -> Self {
        Self {
            name: name.into(),
            behavior: Behavior::Always(Ok(output)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail with the same error on every call.
    pub fn failing(name: impl Into<String>, error: AgentError) -> Self {
        Self {
            name: name.into(),
            behavior: Behavior::Always(Err(error)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep for `delay` before answering. For timeout tests.
    pub fn slow(name: impl Into<String>, delay: Duration, output: AgentOutput) -> Self {
        Self {
            name: name.into(),
            behavior: Behavior::Slow(delay, output),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `invoke` has been called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CapabilityAgent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        _action: &str,
        _input: &AgentInput,
    ) -> std::result::Result<AgentOutput, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Script(responses) => {
                let mut responses = responses.lock().unwrap_or_else(|e| e.into_inner());
                responses.pop().unwrap_or_else(|| {
                    panic!("ScriptedAgent '{}': script exhausted", self.name)
                })
            }
            Behavior::Always(response) => response.clone(),
            Behavior::Slow(delay, output) => {
                tokio::time::sleep(*delay).await;
                Ok(output.clone())
            }
        }
    }
}

/// An intent router that always returns the same classification.
pub struct StaticRouter {
    intent: String,
    confidence: u8,
}

impl StaticRouter {
    pub fn new(intent: impl Into<String>, confidence: u8) -> Self {
        Self {
            intent: intent.into(),
            confidence,
        }
    }
}

#[async_trait]
impl IntentRouter for StaticRouter {
    async fn classify(
        &self,
        _message: &str,
        _history: &[ConversationTurn],
    ) -> std::result::Result<IntentClassification, AgentError> {
        Ok(IntentClassification {
            intent: self.intent.clone(),
            confidence: self.confidence,
        })
    }
}

/// An intent router that always fails.
pub struct FailingRouter;

#[async_trait]
impl IntentRouter for FailingRouter {
    async fn classify(
        &self,
        _message: &str,
        _history: &[ConversationTurn],
    ) -> std::result::Result<IntentClassification, AgentError> {
        Err(AgentError::Network("classifier unreachable".into()))
    }
}
