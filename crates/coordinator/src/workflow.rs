//! Workflow model and registry.
//!
//! Workflows load once at process start into immutable, validated
//! structures and never change afterwards. The registry rejects at
//! startup anything the scheduler would otherwise trip over at run
//! time: empty step lists, unregistered agents, conditions referencing
//! steps that do not come earlier.

use brainstem_agents::AgentRegistry;
use brainstem_core::StructuralError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::condition::StepCondition;

/// Timeout applied when neither the step nor its agent configures one.
const DEFAULT_STEP_TIMEOUT_MS: u64 = 30_000;

/// One unit of work in a workflow.
#[derive(Debug, Clone)]
pub struct WorkflowStep {
    /// Registered agent name. Also the identifier conditions use.
    pub agent: String,

    /// Action sent to the agent.
    pub action: String,

    /// Whether this step may run concurrently with adjacent parallel
    /// steps.
    pub parallel: bool,

    /// Optional gate over earlier step outcomes.
    pub condition: Option<StepCondition>,

    /// Cache TTL for this step's output. Zero means never cache.
    pub cache_ttl: Duration,

    /// Per-call timeout.
    pub timeout: Duration,
}

impl WorkflowStep {
    /// A sequential step with no condition, no caching, default timeout.
    pub fn sequential(agent: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            action: action.into(),
            parallel: false,
            condition: None,
            cache_ttl: Duration::ZERO,
            timeout: Duration::from_millis(DEFAULT_STEP_TIMEOUT_MS),
        }
    }

    /// A parallel-flagged step with no condition, no caching, default
    /// timeout.
    pub fn parallel(agent: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            parallel: true,
            ..Self::sequential(agent, action)
        }
    }

    /// Set the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the condition.
    pub fn with_condition(mut self, condition: StepCondition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Ordered steps for one intent.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub intent: String,
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    /// Partition the ordered step list into execution batches.
    ///
    /// A maximal contiguous run of `parallel` steps becomes one batch;
    /// every other step forms its own singleton batch. Returned as step
    /// indices into `self.steps`.
    pub fn batches(&self) -> Vec<Vec<usize>> {
        let mut batches = Vec::new();
        let mut current: Vec<usize> = Vec::new();

        for (i, step) in self.steps.iter().enumerate() {
            if step.parallel {
                current.push(i);
            } else {
                if !current.is_empty() {
                    batches.push(std::mem::take(&mut current));
                }
                batches.push(vec![i]);
            }
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }
}

/// Immutable table mapping intents to workflows.
#[derive(Debug)]
pub struct WorkflowRegistry {
    workflows: HashMap<String, Arc<Workflow>>,
}

impl WorkflowRegistry {
    /// Build and validate the registry from configuration.
    pub fn from_config(
        config: &brainstem_config::AppConfig,
        agents: &AgentRegistry,
    ) -> Result<Self, StructuralError> {
        let mut workflows = HashMap::new();

        for workflow_config in &config.workflows {
            let intent = workflow_config.intent.clone();

            if workflow_config.steps.is_empty() {
                return Err(StructuralError::EmptyWorkflow(intent));
            }

            let mut steps = Vec::with_capacity(workflow_config.steps.len());
            let mut earlier: Vec<&str> = Vec::new();

            for step_config in &workflow_config.steps {
                if !agents.contains(&step_config.agent) {
                    return Err(StructuralError::UnknownAgent {
                        workflow: intent.clone(),
                        agent: step_config.agent.clone(),
                    });
                }

                let condition = step_config.condition.as_ref().map(StepCondition::from_config);
                if let Some(condition) = &condition {
                    for referenced in condition.referenced_steps() {
                        if !earlier.contains(&referenced) {
                            return Err(StructuralError::InvalidConditionReference {
                                workflow: intent.clone(),
                                step: step_config.agent.clone(),
                                referenced: referenced.to_string(),
                            });
                        }
                    }
                }

                let timeout_ms = step_config.timeout_ms.unwrap_or_else(|| {
                    config
                        .agents
                        .get(&step_config.agent)
                        .map(|a| a.timeout_ms)
                        .unwrap_or(DEFAULT_STEP_TIMEOUT_MS)
                });

                steps.push(WorkflowStep {
                    agent: step_config.agent.clone(),
                    action: step_config.action.clone(),
                    parallel: step_config.parallel,
                    condition,
                    cache_ttl: Duration::from_millis(step_config.cache_ttl_ms),
                    timeout: Duration::from_millis(timeout_ms),
                });
                earlier.push(&step_config.agent);
            }

            let workflow = Arc::new(Workflow {
                intent: intent.clone(),
                steps,
            });
            if workflows.insert(intent.clone(), workflow).is_some() {
                return Err(StructuralError::DuplicateIntent(intent));
            }
        }

        info!(workflows = workflows.len(), "Workflow registry loaded");
        Ok(Self { workflows })
    }

    /// Build from already-constructed workflows (tests, embedding).
    pub fn from_workflows(workflows: impl IntoIterator<Item = Workflow>) -> Self {
        Self {
            workflows: workflows
                .into_iter()
                .map(|w| (w.intent.clone(), Arc::new(w)))
                .collect(),
        }
    }

    /// Resolve an intent to its workflow.
    pub fn resolve(&self, intent: &str) -> Result<Arc<Workflow>, StructuralError> {
        self.workflows
            .get(intent)
            .cloned()
            .ok_or_else(|| StructuralError::UnknownIntent(intent.to_string()))
    }

    /// All registered intents, sorted.
    pub fn intents(&self) -> Vec<&str> {
        let mut intents: Vec<&str> = self.workflows.keys().map(|s| s.as_str()).collect();
        intents.sort_unstable();
        intents
    }

    /// Number of registered workflows.
    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    /// Whether no workflows are registered.
    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brainstem_config::AppConfig;

    fn deciding_workflow() -> Workflow {
        Workflow {
            intent: "deciding".into(),
            steps: vec![
                WorkflowStep::sequential("reflect", "reflect"),
                WorkflowStep::sequential("record", "record"),
                WorkflowStep::parallel("verify", "verify"),
                WorkflowStep::parallel("scan_assumptions", "scan"),
                WorkflowStep::sequential("check_consistency", "check"),
            ],
        }
    }

    #[test]
    fn batch_partitioning_matches_adjacency() {
        // [seq, seq, par, par, seq] → [[0], [1], [2, 3], [4]]
        let workflow = deciding_workflow();
        let batches = workflow.batches();
        assert_eq!(batches, vec![vec![0], vec![1], vec![2, 3], vec![4]]);
    }

    #[test]
    fn all_parallel_forms_one_batch() {
        let workflow = Workflow {
            intent: "sweep".into(),
            steps: vec![
                WorkflowStep::parallel("a", "x"),
                WorkflowStep::parallel("b", "x"),
                WorkflowStep::parallel("c", "x"),
            ],
        };
        assert_eq!(workflow.batches(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn all_sequential_forms_singletons() {
        let workflow = Workflow {
            intent: "chain".into(),
            steps: vec![
                WorkflowStep::sequential("a", "x"),
                WorkflowStep::sequential("b", "x"),
            ],
        };
        assert_eq!(workflow.batches(), vec![vec![0], vec![1]]);
    }

    #[test]
    fn trailing_parallel_run_is_flushed() {
        let workflow = Workflow {
            intent: "tail".into(),
            steps: vec![
                WorkflowStep::sequential("a", "x"),
                WorkflowStep::parallel("b", "x"),
                WorkflowStep::parallel("c", "x"),
            ],
        };
        assert_eq!(workflow.batches(), vec![vec![0], vec![1, 2]]);
    }

    #[test]
    fn registry_from_sample_config() {
        let config = AppConfig::sample();
        let agents = brainstem_agents::build_from_config(&config);
        let registry = WorkflowRegistry::from_config(&config, &agents).unwrap();

        assert_eq!(registry.len(), 1);
        let workflow = registry.resolve("deciding").unwrap();
        assert_eq!(workflow.steps.len(), 5);
        assert_eq!(workflow.steps[0].cache_ttl, Duration::from_millis(120_000));
        // Step timeout falls back to the agent's configured timeout.
        assert_eq!(workflow.steps[0].timeout, Duration::from_millis(30_000));
    }

    #[test]
    fn unknown_intent_not_found() {
        let registry = WorkflowRegistry::from_workflows([deciding_workflow()]);
        let err = registry.resolve("daydreaming").unwrap_err();
        assert!(matches!(err, StructuralError::UnknownIntent(_)));
    }

    #[test]
    fn unregistered_agent_rejected() {
        let mut config = AppConfig::sample();
        let agents = brainstem_agents::build_from_config(&config);
        config.workflows[0].steps[1].agent = "ghost".into();

        let err = WorkflowRegistry::from_config(&config, &agents).unwrap_err();
        assert!(matches!(err, StructuralError::UnknownAgent { .. }));
    }

    #[test]
    fn empty_steps_rejected() {
        let mut config = AppConfig::sample();
        let agents = brainstem_agents::build_from_config(&config);
        config.workflows[0].steps.clear();

        let err = WorkflowRegistry::from_config(&config, &agents).unwrap_err();
        assert!(matches!(err, StructuralError::EmptyWorkflow(_)));
    }

    #[test]
    fn condition_must_reference_earlier_step() {
        let mut config = AppConfig::sample();
        let agents = brainstem_agents::build_from_config(&config);
        // First step referencing a later step is rejected.
        config.workflows[0].steps[0].condition =
            Some(brainstem_config::ConditionConfig::Succeeded {
                step: "verify".into(),
            });

        let err = WorkflowRegistry::from_config(&config, &agents).unwrap_err();
        assert!(matches!(
            err,
            StructuralError::InvalidConditionReference { .. }
        ));
    }

    #[test]
    fn intents_sorted() {
        let registry = WorkflowRegistry::from_workflows([
            Workflow {
                intent: "exploring".into(),
                steps: vec![WorkflowStep::sequential("a", "x")],
            },
            Workflow {
                intent: "deciding".into(),
                steps: vec![WorkflowStep::sequential("a", "x")],
            },
        ]);
        assert_eq!(registry.intents(), vec!["deciding", "exploring"]);
    }
}
