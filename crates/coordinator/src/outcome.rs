//! Step outcomes and the aggregated result of a workflow run.

use brainstem_core::AgentOutput;
use serde::{Deserialize, Serialize};

/// How a step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// The agent produced an output (live or from cache).
    Success,
    /// The agent failed or timed out.
    Failed,
    /// The step's condition evaluated false; the agent was never invoked.
    Skipped,
}

/// The outcome of one workflow step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Registered agent name.
    pub agent: String,

    /// Action that was (or would have been) sent.
    pub action: String,

    /// How the step ended.
    pub status: StepStatus,

    /// The agent's output, present only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<AgentOutput>,

    /// The failure reason, present only on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Whether the output was served from the response cache.
    #[serde(default)]
    pub from_cache: bool,

    /// Wall-clock latency of the invocation (0 for hits and skips).
    #[serde(default)]
    pub latency_ms: u64,
}

impl StepOutcome {
    /// A successful step.
    pub fn success(
        agent: impl Into<String>,
        action: impl Into<String>,
        output: AgentOutput,
        from_cache: bool,
        latency_ms: u64,
    ) -> Self {
        Self {
            agent: agent.into(),
            action: action.into(),
            status: StepStatus::Success,
            output: Some(output),
            error: None,
            from_cache,
            latency_ms,
        }
    }

    /// A failed step.
    pub fn failed(
        agent: impl Into<String>,
        action: impl Into<String>,
        error: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            agent: agent.into(),
            action: action.into(),
            status: StepStatus::Failed,
            output: None,
            error: Some(error.into()),
            from_cache: false,
            latency_ms,
        }
    }

    /// A skipped step.
    pub fn skipped(agent: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            action: action.into(),
            status: StepStatus::Skipped,
            output: None,
            error: None,
            from_cache: false,
            latency_ms: 0,
        }
    }
}

/// Every step's outcome, in workflow order.
///
/// Grows batch by batch: batch *N* only ever observes the outcomes of
/// batches 1..N−1 merged here before it starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub steps: Vec<StepOutcome>,
}

impl AggregatedResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one settled batch, preserving workflow order.
    pub fn merge(&mut self, outcomes: impl IntoIterator<Item = StepOutcome>) {
        self.steps.extend(outcomes);
    }

    /// The most recent outcome recorded for an agent.
    pub fn outcome(&self, agent: &str) -> Option<&StepOutcome> {
        self.steps.iter().rev().find(|o| o.agent == agent)
    }

    /// Whether the agent's most recent step succeeded.
    pub fn succeeded(&self, agent: &str) -> bool {
        matches!(
            self.outcome(agent),
            Some(StepOutcome {
                status: StepStatus::Success,
                ..
            })
        )
    }

    /// Output content of the agent's most recent successful step.
    pub fn output_of(&self, agent: &str) -> Option<&str> {
        self.outcome(agent)
            .and_then(|o| o.output.as_ref())
            .map(|o| o.content.as_str())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_latest_outcome() {
        let mut agg = AggregatedResult::new();
        agg.merge([
            StepOutcome::failed("verify", "verify", "boom", 10),
            StepOutcome::success("verify", "verify", AgentOutput::public("ok", 5), false, 20),
        ]);

        let outcome = agg.outcome("verify").unwrap();
        assert_eq!(outcome.status, StepStatus::Success);
        assert!(agg.succeeded("verify"));
        assert_eq!(agg.output_of("verify"), Some("ok"));
    }

    #[test]
    fn missing_agent_has_no_outcome() {
        let agg = AggregatedResult::new();
        assert!(agg.outcome("verify").is_none());
        assert!(!agg.succeeded("verify"));
        assert!(agg.output_of("verify").is_none());
    }

    #[test]
    fn skipped_outcome_shape() {
        let outcome = StepOutcome::skipped("check_consistency", "check");
        assert_eq!(outcome.status, StepStatus::Skipped);
        assert!(outcome.output.is_none());
        assert!(outcome.error.is_none());
        assert_eq!(outcome.latency_ms, 0);
    }

    #[test]
    fn outcome_serialization_omits_empty_fields() {
        let outcome = StepOutcome::skipped("verify", "verify");
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(!json.contains("output"));
        assert!(!json.contains("error"));
        assert!(json.contains("skipped"));
    }
}
