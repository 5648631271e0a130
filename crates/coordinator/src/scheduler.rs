//! The scheduler — runs a workflow's batches against the agent registry.
//!
//! Batches execute strictly in order; a later batch only begins after
//! the prior batch fully settles and its outcomes are merged (the
//! barrier). Within a multi-step batch, steps run as concurrent tasks
//! and never observe each other's output — conditions are evaluated
//! against the aggregate *before* the batch launches.
//!
//! Each step's invocation runs in a detached task: if the overall
//! request is abandoned mid-flight, the invocation still completes and
//! its result still lands in the response cache for future reuse.
//!
//! Failure semantics: agent errors and timeouts are recovered into
//! failed step outcomes and never cancel batch siblings. The scheduler
//! itself only errors on structural problems, such as a step referencing
//! an agent nobody registered.

use brainstem_agents::AgentRegistry;
use brainstem_cache::ResponseCache;
use brainstem_core::{
    AgentError, AgentInput, ConversationTurn, ProjectState, StateFingerprint, StructuralError,
};
use brainstem_metrics::{CallSample, ResourceMetrics};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::outcome::{AggregatedResult, StepOutcome};
use crate::pruning::ContextPruner;
use crate::workflow::{Workflow, WorkflowStep};

/// Everything one request carries into execution.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub conversation_id: String,
    pub message: String,
    pub history: Vec<ConversationTurn>,
    pub state: ProjectState,
    pub fingerprint: StateFingerprint,
}

impl RequestContext {
    /// Build a context; the fingerprint is derived from the state once,
    /// so every step of this request caches against the same snapshot.
    pub fn new(
        conversation_id: impl Into<String>,
        message: impl Into<String>,
        history: Vec<ConversationTurn>,
        state: ProjectState,
    ) -> Self {
        let fingerprint = state.fingerprint();
        Self {
            conversation_id: conversation_id.into(),
            message: message.into(),
            history,
            state,
            fingerprint,
        }
    }
}

/// Runs workflows. Shares the cache, metrics, and pruner by handle.
pub struct Scheduler {
    agents: Arc<AgentRegistry>,
    cache: Arc<ResponseCache>,
    metrics: Arc<ResourceMetrics>,
    pruner: Arc<ContextPruner>,
}

impl Scheduler {
    pub fn new(
        agents: Arc<AgentRegistry>,
        cache: Arc<ResponseCache>,
        metrics: Arc<ResourceMetrics>,
        pruner: Arc<ContextPruner>,
    ) -> Self {
        Self {
            agents,
            cache,
            metrics,
            pruner,
        }
    }

    /// Execute every batch of `workflow`, in order, and return every
    /// step's outcome in defined order.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        ctx: &RequestContext,
    ) -> Result<AggregatedResult, StructuralError> {
        let batches = workflow.batches();
        info!(
            intent = %workflow.intent,
            steps = workflow.steps.len(),
            batches = batches.len(),
            "Executing workflow"
        );

        let mut aggregated = AggregatedResult::new();

        for batch in batches {
            let mut settled: Vec<(usize, StepOutcome)> = Vec::with_capacity(batch.len());
            let mut running = Vec::new();

            for idx in batch {
                let step = &workflow.steps[idx];

                // Conditions see prior batches only; siblings are
                // invisible by construction.
                if let Some(condition) = &step.condition {
                    if !condition.evaluate(&aggregated) {
                        debug!(agent = %step.agent, "Condition false, skipping step");
                        settled.push((idx, StepOutcome::skipped(&step.agent, &step.action)));
                        continue;
                    }
                }

                running.push(async move {
                    (idx, self.run_step(&workflow.intent, step, ctx).await)
                });
            }

            // Wait for the whole batch to settle — success or failure.
            for (idx, result) in join_all(running).await {
                settled.push((idx, result?));
            }

            // Merge in defined order before the next batch begins.
            settled.sort_by_key(|(idx, _)| *idx);
            aggregated.merge(settled.into_iter().map(|(_, outcome)| outcome));
        }

        Ok(aggregated)
    }

    /// Run one step: prune, consult the cache, invoke with a timeout.
    async fn run_step(
        &self,
        intent: &str,
        step: &WorkflowStep,
        ctx: &RequestContext,
    ) -> Result<StepOutcome, StructuralError> {
        let agent = self
            .agents
            .get(&step.agent)
            .ok_or_else(|| StructuralError::UnknownAgent {
                workflow: intent.to_string(),
                agent: step.agent.clone(),
            })?;

        let input = AgentInput {
            message: ctx.message.clone(),
            history: self.pruner.prune(&step.agent, &ctx.history),
            state: ctx.state.data.clone(),
        };

        if !step.cache_ttl.is_zero() {
            if let Some(hit) = self.cache.get(&step.agent, &input, &ctx.fingerprint) {
                debug!(agent = %step.agent, action = %step.action, "Step served from cache");
                self.metrics
                    .record_call(&step.agent, CallSample::hit(hit.estimated_tokens));
                return Ok(StepOutcome::success(
                    &step.agent,
                    &step.action,
                    hit,
                    true,
                    0,
                ));
            }
        }

        let started = Instant::now();

        // Detached task: dropping the request future abandons the await
        // but not the invocation, and the result is still cached.
        let task = {
            let agent = agent.clone();
            let cache = self.cache.clone();
            let fingerprint = ctx.fingerprint.clone();
            let input = input.clone();
            let agent_name = step.agent.clone();
            let action = step.action.clone();
            let timeout = step.timeout;
            let ttl = step.cache_ttl;

            tokio::spawn(async move {
                match tokio::time::timeout(timeout, agent.invoke(&action, &input)).await {
                    Ok(Ok(output)) => {
                        cache.put(&agent_name, &input, &fingerprint, output.clone(), ttl);
                        Ok(output)
                    }
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(AgentError::Timeout {
                        agent: agent_name,
                        timeout_ms: timeout.as_millis() as u64,
                    }),
                }
            })
        };

        match task.await {
            Ok(Ok(output)) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                self.metrics.record_call(
                    &step.agent,
                    CallSample::live(output.estimated_tokens, latency_ms),
                );
                Ok(StepOutcome::success(
                    &step.agent,
                    &step.action,
                    output,
                    false,
                    latency_ms,
                ))
            }
            Ok(Err(e)) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                warn!(agent = %step.agent, error = %e, "Step failed");
                self.metrics
                    .record_call(&step.agent, CallSample::failure(latency_ms));
                Ok(StepOutcome::failed(
                    &step.agent,
                    &step.action,
                    e.to_string(),
                    latency_ms,
                ))
            }
            Err(join_error) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                warn!(agent = %step.agent, error = %join_error, "Invocation task aborted");
                self.metrics
                    .record_call(&step.agent, CallSample::failure(latency_ms));
                Ok(StepOutcome::failed(
                    &step.agent,
                    &step.action,
                    format!("invocation task aborted: {join_error}"),
                    latency_ms,
                ))
            }
        }
    }
}
