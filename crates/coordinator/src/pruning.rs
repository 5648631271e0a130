//! Context pruning — bounds the history handed to each agent call.
//!
//! Pure and deterministic: identical arguments always produce identical
//! output. The triggering turn (the last in the history) is never
//! pruned; rules only remove historical noise before it. The state
//! snapshot travels beside the history and is never subject to pruning.

use brainstem_core::ConversationTurn;
use std::collections::HashMap;

/// Hard ceiling applied to tag-filter rules regardless of configuration.
const TAGGED_SAFETY_MAX: usize = 200;

/// A per-agent history-bounding policy.
#[derive(Debug, Clone)]
pub enum PruningRule {
    /// Keep the last `n` turns, chronological.
    FixedWindow(usize),
    /// Keep turns carrying a structural tag, capped at `max` (newest
    /// kept), plus the triggering turn.
    Tagged { tag: String, max: usize },
    /// Keep the full history. Use sparingly, for agents that need
    /// global context.
    Full,
}

/// Selects and applies pruning rules per agent.
pub struct ContextPruner {
    default_window: usize,
    rules: HashMap<String, PruningRule>,
}

impl ContextPruner {
    /// Create a pruner with an explicit rule table.
    pub fn new(default_window: usize, rules: HashMap<String, PruningRule>) -> Self {
        Self {
            default_window: default_window.max(1),
            rules,
        }
    }

    /// Build from configuration.
    pub fn from_config(config: &brainstem_config::PruningConfig) -> Self {
        let rules = config
            .rules
            .iter()
            .map(|(agent, rule)| {
                let rule = match rule {
                    brainstem_config::PruningRuleConfig::FixedWindow { turns } => {
                        PruningRule::FixedWindow(*turns)
                    }
                    brainstem_config::PruningRuleConfig::Tagged { tag, max_turns } => {
                        PruningRule::Tagged {
                            tag: tag.clone(),
                            max: (*max_turns).min(TAGGED_SAFETY_MAX),
                        }
                    }
                    brainstem_config::PruningRuleConfig::Full => PruningRule::Full,
                };
                (agent.clone(), rule)
            })
            .collect();

        Self::new(config.default_window, rules)
    }

    /// The rule that applies to an agent.
    pub fn rule_for(&self, agent: &str) -> PruningRule {
        self.rules
            .get(agent)
            .cloned()
            .unwrap_or(PruningRule::FixedWindow(self.default_window))
    }

    /// Bound `history` for one agent call.
    ///
    /// The last turn is the triggering turn and is always retained.
    pub fn prune(&self, agent: &str, history: &[ConversationTurn]) -> Vec<ConversationTurn> {
        let Some((trigger, earlier)) = history.split_last() else {
            return Vec::new();
        };

        match self.rule_for(agent) {
            PruningRule::Full => history.to_vec(),
            PruningRule::FixedWindow(n) => {
                // Last n turns overall; the trigger counts toward the
                // window but survives even a window of zero.
                let n = n.max(1);
                let start = history.len().saturating_sub(n);
                history[start..].to_vec()
            }
            PruningRule::Tagged { tag, max } => {
                let tagged: Vec<&ConversationTurn> =
                    earlier.iter().filter(|t| t.has_tag(&tag)).collect();
                let start = tagged.len().saturating_sub(max);
                let mut kept: Vec<ConversationTurn> =
                    tagged[start..].iter().map(|t| (*t).clone()).collect();
                kept.push(trigger.clone());
                kept
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(n: usize) -> Vec<ConversationTurn> {
        (0..n)
            .map(|i| ConversationTurn::user(format!("turn {i}")))
            .collect()
    }

    fn pruner_with(agent: &str, rule: PruningRule) -> ContextPruner {
        let mut rules = HashMap::new();
        rules.insert(agent.to_string(), rule);
        ContextPruner::new(20, rules)
    }

    #[test]
    fn empty_history_stays_empty() {
        let pruner = ContextPruner::new(20, HashMap::new());
        assert!(pruner.prune("reflect", &[]).is_empty());
    }

    #[test]
    fn fixed_window_keeps_last_n_chronological() {
        let pruner = pruner_with("reflect", PruningRule::FixedWindow(3));
        let turns = history(10);

        let pruned = pruner.prune("reflect", &turns);
        assert_eq!(pruned.len(), 3);
        assert_eq!(pruned[0].content, "turn 7");
        assert_eq!(pruned[2].content, "turn 9");
    }

    #[test]
    fn fixed_window_shorter_history_untouched() {
        let pruner = pruner_with("reflect", PruningRule::FixedWindow(10));
        let turns = history(4);
        assert_eq!(pruner.prune("reflect", &turns).len(), 4);
    }

    #[test]
    fn trigger_survives_zero_window() {
        let pruner = pruner_with("reflect", PruningRule::FixedWindow(0));
        let turns = history(5);

        let pruned = pruner.prune("reflect", &turns);
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].content, "turn 4");
    }

    #[test]
    fn default_window_applies_without_rule() {
        let pruner = ContextPruner::new(5, HashMap::new());
        let turns = history(12);

        let pruned = pruner.prune("unknown_agent", &turns);
        assert_eq!(pruned.len(), 5);
        assert_eq!(pruned[4].content, "turn 11");
    }

    #[test]
    fn full_keeps_everything() {
        let pruner = pruner_with("check_consistency", PruningRule::Full);
        let turns = history(30);
        assert_eq!(pruner.prune("check_consistency", &turns).len(), 30);
    }

    #[test]
    fn tagged_keeps_matching_turns_plus_trigger() {
        let pruner = pruner_with(
            "record",
            PruningRule::Tagged {
                tag: "decision".into(),
                max: 50,
            },
        );

        let mut turns = vec![
            ConversationTurn::user("chatter"),
            ConversationTurn::system("Decided: ship monday").with_tags(["decision"]),
            ConversationTurn::user("more chatter"),
            ConversationTurn::system("Decided: skip the beta").with_tags(["decision"]),
        ];
        turns.push(ConversationTurn::user("record the latest decision"));

        let pruned = pruner.prune("record", &turns);
        assert_eq!(pruned.len(), 3);
        assert!(pruned[0].content.contains("ship monday"));
        assert!(pruned[1].content.contains("skip the beta"));
        assert_eq!(pruned[2].content, "record the latest decision");
    }

    #[test]
    fn tagged_cap_keeps_newest() {
        let pruner = pruner_with(
            "record",
            PruningRule::Tagged {
                tag: "decision".into(),
                max: 2,
            },
        );

        let mut turns: Vec<ConversationTurn> = (0..5)
            .map(|i| ConversationTurn::system(format!("decision {i}")).with_tags(["decision"]))
            .collect();
        turns.push(ConversationTurn::user("trigger"));

        let pruned = pruner.prune("record", &turns);
        assert_eq!(pruned.len(), 3);
        assert_eq!(pruned[0].content, "decision 3");
        assert_eq!(pruned[1].content, "decision 4");
        assert_eq!(pruned[2].content, "trigger");
    }

    #[test]
    fn pruning_is_deterministic() {
        let pruner = pruner_with(
            "record",
            PruningRule::Tagged {
                tag: "decision".into(),
                max: 10,
            },
        );
        let mut turns = history(8);
        turns[2] = ConversationTurn::system("decided something").with_tags(["decision"]);

        let a = pruner.prune("record", &turns);
        let b = pruner.prune("record", &turns);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.content, y.content);
        }
    }

    #[test]
    fn from_config_caps_tagged_max() {
        let mut rules = HashMap::new();
        rules.insert(
            "record".to_string(),
            brainstem_config::PruningRuleConfig::Tagged {
                tag: "decision".into(),
                max_turns: 10_000,
            },
        );
        let config = brainstem_config::PruningConfig {
            default_window: 20,
            rules,
        };

        let pruner = ContextPruner::from_config(&config);
        match pruner.rule_for("record") {
            PruningRule::Tagged { max, .. } => assert_eq!(max, TAGGED_SAFETY_MAX),
            other => panic!("unexpected rule: {other:?}"),
        }
    }
}
