//! Step conditions — enumerated predicates over earlier step outcomes.
//!
//! A condition gates a step on what previous batches produced. The
//! predicate set is closed and composition is explicit: `All` is
//! conjunction (empty ⇒ vacuously true), `Any` is disjunction (empty ⇒
//! false). A predicate referencing a step with no recorded outcome is
//! not satisfied.

use brainstem_config::ConditionConfig;
use serde::{Deserialize, Serialize};

use crate::outcome::{AggregatedResult, StepStatus};

/// An enumerated, composable step predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepCondition {
    /// The referenced step's most recent outcome is a success.
    Succeeded { step: String },
    /// The referenced step has an outcome and it is not a success
    /// (failed or skipped).
    Failed { step: String },
    /// The referenced step succeeded and its output contains `pattern`.
    OutputContains { step: String, pattern: String },
    /// All sub-conditions hold.
    All(Vec<StepCondition>),
    /// At least one sub-condition holds.
    Any(Vec<StepCondition>),
}

impl StepCondition {
    /// Build from the configuration representation.
    pub fn from_config(config: &ConditionConfig) -> Self {
        match config {
            ConditionConfig::Succeeded { step } => Self::Succeeded { step: step.clone() },
            ConditionConfig::Failed { step } => Self::Failed { step: step.clone() },
            ConditionConfig::OutputContains { step, pattern } => Self::OutputContains {
                step: step.clone(),
                pattern: pattern.clone(),
            },
            ConditionConfig::All { of } => Self::All(of.iter().map(Self::from_config).collect()),
            ConditionConfig::Any { of } => Self::Any(of.iter().map(Self::from_config).collect()),
        }
    }

    /// Step names this condition (recursively) references.
    pub fn referenced_steps(&self) -> Vec<&str> {
        match self {
            Self::Succeeded { step } | Self::Failed { step } => vec![step.as_str()],
            Self::OutputContains { step, .. } => vec![step.as_str()],
            Self::All(of) | Self::Any(of) => {
                of.iter().flat_map(|c| c.referenced_steps()).collect()
            }
        }
    }

    /// Evaluate against the outcomes accumulated so far.
    pub fn evaluate(&self, result: &AggregatedResult) -> bool {
        match self {
            Self::Succeeded { step } => result.succeeded(step),
            Self::Failed { step } => matches!(
                result.outcome(step).map(|o| o.status),
                Some(StepStatus::Failed) | Some(StepStatus::Skipped)
            ),
            Self::OutputContains { step, pattern } => result
                .output_of(step)
                .is_some_and(|content| content.contains(pattern)),
            Self::All(of) => of.iter().all(|c| c.evaluate(result)),
            Self::Any(of) => of.iter().any(|c| c.evaluate(result)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::StepOutcome;
    use brainstem_core::AgentOutput;

    fn result_with(outcomes: Vec<StepOutcome>) -> AggregatedResult {
        let mut agg = AggregatedResult::new();
        agg.merge(outcomes);
        agg
    }

    #[test]
    fn succeeded_requires_success() {
        let agg = result_with(vec![StepOutcome::success(
            "reflect",
            "reflect",
            AgentOutput::public("thoughts", 10),
            false,
            100,
        )]);

        assert!(StepCondition::Succeeded {
            step: "reflect".into()
        }
        .evaluate(&agg));
        assert!(!StepCondition::Succeeded {
            step: "verify".into()
        }
        .evaluate(&agg));
    }

    #[test]
    fn failed_matches_failed_and_skipped() {
        let agg = result_with(vec![
            StepOutcome::failed("verify", "verify", "boom", 10),
            StepOutcome::skipped("record", "record"),
        ]);

        assert!(StepCondition::Failed {
            step: "verify".into()
        }
        .evaluate(&agg));
        assert!(StepCondition::Failed {
            step: "record".into()
        }
        .evaluate(&agg));
        // No outcome at all is not "failed".
        assert!(!StepCondition::Failed {
            step: "reflect".into()
        }
        .evaluate(&agg));
    }

    #[test]
    fn output_contains_matches_substring() {
        let agg = result_with(vec![StepOutcome::success(
            "scan_assumptions",
            "scan",
            AgentOutput::public("found 2 gaps in the plan", 10),
            false,
            100,
        )]);

        assert!(StepCondition::OutputContains {
            step: "scan_assumptions".into(),
            pattern: "gaps".into()
        }
        .evaluate(&agg));
        assert!(!StepCondition::OutputContains {
            step: "scan_assumptions".into(),
            pattern: "no issues".into()
        }
        .evaluate(&agg));
    }

    #[test]
    fn all_is_conjunction_and_vacuously_true() {
        let agg = result_with(vec![StepOutcome::success(
            "reflect",
            "reflect",
            AgentOutput::public("ok", 1),
            false,
            1,
        )]);

        assert!(StepCondition::All(vec![]).evaluate(&agg));
        assert!(StepCondition::All(vec![StepCondition::Succeeded {
            step: "reflect".into()
        }])
        .evaluate(&agg));
        assert!(!StepCondition::All(vec![
            StepCondition::Succeeded {
                step: "reflect".into()
            },
            StepCondition::Succeeded {
                step: "verify".into()
            },
        ])
        .evaluate(&agg));
    }

    #[test]
    fn any_is_disjunction_and_empty_is_false() {
        let agg = result_with(vec![StepOutcome::failed("verify", "verify", "boom", 1)]);

        assert!(!StepCondition::Any(vec![]).evaluate(&agg));
        assert!(StepCondition::Any(vec![
            StepCondition::Succeeded {
                step: "verify".into()
            },
            StepCondition::Failed {
                step: "verify".into()
            },
        ])
        .evaluate(&agg));
    }

    #[test]
    fn nested_composition() {
        // "gaps found AND (reflect succeeded OR record succeeded)"
        let agg = result_with(vec![
            StepOutcome::success("reflect", "reflect", AgentOutput::public("done", 1), false, 1),
            StepOutcome::success(
                "scan_assumptions",
                "scan",
                AgentOutput::public("gaps found", 1),
                false,
                1,
            ),
        ]);

        let cond = StepCondition::All(vec![
            StepCondition::OutputContains {
                step: "scan_assumptions".into(),
                pattern: "gaps".into(),
            },
            StepCondition::Any(vec![
                StepCondition::Succeeded {
                    step: "reflect".into(),
                },
                StepCondition::Succeeded {
                    step: "record".into(),
                },
            ]),
        ]);

        assert!(cond.evaluate(&agg));
    }

    #[test]
    fn from_config_preserves_structure() {
        let config = ConditionConfig::All {
            of: vec![
                ConditionConfig::Succeeded {
                    step: "record".into(),
                },
                ConditionConfig::OutputContains {
                    step: "scan_assumptions".into(),
                    pattern: "gap".into(),
                },
            ],
        };

        let cond = StepCondition::from_config(&config);
        assert_eq!(cond.referenced_steps(), vec!["record", "scan_assumptions"]);
    }
}
