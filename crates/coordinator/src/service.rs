//! The coordination service — the top-level request façade.
//!
//! One request moves through the phases
//! `Received → IntentResolved → WorkflowSelected → Executing →
//! Aggregated → Persisted → Responded`; `Failed` is reachable only from
//! an unresolved intent or an unknown workflow. Everything after that
//! point is partial-success territory: the response always reflects
//! whichever steps succeeded.

use brainstem_core::{
    ConversationTurn, Error, IntentRouter, StateDelta, StateStore, StructuralError, Visibility,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::outcome::{StepOutcome, StepStatus};
use crate::persist::PersistQueue;
use crate::scheduler::{RequestContext, Scheduler};
use crate::workflow::WorkflowRegistry;

/// The request state machine's phases, carried in traces and the final
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPhase {
    Received,
    IntentResolved,
    WorkflowSelected,
    Executing,
    Aggregated,
    Persisted,
    Responded,
    Failed,
}

/// One step's outcome as shown to the caller. Internal-only outputs are
/// omitted; status, latency, and cache provenance are always visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSummary {
    pub agent: String,
    pub action: String,
    pub status: StepStatus,
    pub from_cache: bool,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepSummary {
    fn from_outcome(outcome: &StepOutcome) -> Self {
        let output = outcome.output.as_ref().and_then(|o| match o.visibility {
            Visibility::Public => Some(o.content.clone()),
            Visibility::Internal => None,
        });
        Self {
            agent: outcome.agent.clone(),
            action: outcome.action.clone(),
            status: outcome.status,
            from_cache: outcome.from_cache,
            latency_ms: outcome.latency_ms,
            output,
            error: outcome.error.clone(),
        }
    }
}

/// What the caller receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalResponse {
    pub conversation_id: String,
    pub intent: String,
    pub confidence: u8,
    /// Public step outputs merged in workflow order.
    pub reply: String,
    /// Every step's summarized outcome, in workflow order.
    pub steps: Vec<StepSummary>,
    pub phase: RequestPhase,
}

/// The top-level coordination façade.
pub struct CoordinationService {
    router: Arc<dyn IntentRouter>,
    workflows: Arc<WorkflowRegistry>,
    scheduler: Scheduler,
    store: Arc<dyn StateStore>,
    persist: PersistQueue,
    confidence_floor: u8,
}

impl CoordinationService {
    pub fn new(
        router: Arc<dyn IntentRouter>,
        workflows: Arc<WorkflowRegistry>,
        scheduler: Scheduler,
        store: Arc<dyn StateStore>,
        persist: PersistQueue,
    ) -> Self {
        Self {
            router,
            workflows,
            scheduler,
            store,
            persist,
            confidence_floor: 0,
        }
    }

    /// Treat classifications below `floor` as unresolved intents.
    pub fn with_confidence_floor(mut self, floor: u8) -> Self {
        self.confidence_floor = floor;
        self
    }

    /// The workflow registry backing this service.
    pub fn workflows(&self) -> &Arc<WorkflowRegistry> {
        &self.workflows
    }

    /// Handle one request end to end.
    pub async fn handle(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<FinalResponse, Error> {
        debug!(phase = ?RequestPhase::Received, conversation_id, "Handling request");

        // History and project state have no dependency on each other —
        // fetch both concurrently.
        let (history, state) = tokio::try_join!(
            self.store.history(conversation_id),
            self.store.project_state(conversation_id),
        )?;

        let classification = self
            .router
            .classify(message, &history)
            .await
            .map_err(|e| StructuralError::ClassificationFailed(e.to_string()))?;

        if self.confidence_floor > 0 && classification.confidence < self.confidence_floor {
            return Err(StructuralError::LowConfidence {
                intent: classification.intent,
                confidence: classification.confidence,
                floor: self.confidence_floor,
            }
            .into());
        }
        debug!(
            phase = ?RequestPhase::IntentResolved,
            intent = %classification.intent,
            confidence = classification.confidence,
            "Intent resolved"
        );

        let workflow = self.workflows.resolve(&classification.intent)?;
        debug!(phase = ?RequestPhase::WorkflowSelected, intent = %workflow.intent, "Workflow selected");

        let ctx = RequestContext::new(conversation_id, message, history, state);
        debug!(phase = ?RequestPhase::Executing, "Executing");
        let aggregated = self.scheduler.execute(&workflow, &ctx).await?;
        debug!(phase = ?RequestPhase::Aggregated, steps = aggregated.len(), "Aggregated");

        let reply = merge_reply(&aggregated.steps);
        let steps: Vec<StepSummary> = aggregated.steps.iter().map(StepSummary::from_outcome).collect();

        let mut turns = vec![ConversationTurn::user(message)];
        if !reply.is_empty() {
            turns.push(ConversationTurn::assistant(&reply));
        }
        self.persist.enqueue(conversation_id, StateDelta::turns(turns));
        debug!(phase = ?RequestPhase::Persisted, "Persistence enqueued");

        info!(
            phase = ?RequestPhase::Responded,
            conversation_id,
            intent = %classification.intent,
            steps = steps.len(),
            "Request complete"
        );

        Ok(FinalResponse {
            conversation_id: conversation_id.to_string(),
            intent: classification.intent,
            confidence: classification.confidence,
            reply,
            steps,
            phase: RequestPhase::Responded,
        })
    }
}

/// Merge public outputs of successful steps, in workflow order.
fn merge_reply(steps: &[StepOutcome]) -> String {
    steps
        .iter()
        .filter(|o| o.status == StepStatus::Success)
        .filter_map(|o| o.output.as_ref())
        .filter(|o| o.visibility == Visibility::Public)
        .map(|o| o.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
