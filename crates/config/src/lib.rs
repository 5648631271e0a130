//! Configuration loading, validation, and management for Brainstem.
//!
//! Loads configuration from a TOML file with environment variable
//! overrides for secrets. Workflow definitions, per-agent pruning and
//! cache TTL rules are all static configuration: loaded once at process
//! start, validated, then immutable. There is no hot-reload contract.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Fallback API key for agents without their own key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Intent router configuration
    #[serde(default)]
    pub intent: IntentRouterConfig,

    /// Capability agents, by registered name
    #[serde(default)]
    pub agents: HashMap<String, AgentConfig>,

    /// Workflow definitions (intent → ordered steps)
    #[serde(default)]
    pub workflows: Vec<WorkflowConfig>,

    /// History pruning rules
    #[serde(default)]
    pub pruning: PruningConfig,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Fire-and-forget persistence settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("intent", &self.intent)
            .field("agents", &self.agents)
            .field("workflows", &self.workflows)
            .field("pruning", &self.pruning)
            .field("cache", &self.cache)
            .field("persistence", &self.persistence)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Which agent classifies intents, and how picky to be.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRouterConfig {
    /// Registered name of the agent that performs classification.
    #[serde(default = "default_intent_agent")]
    pub agent: String,

    /// Action sent to the classifier agent.
    #[serde(default = "default_intent_action")]
    pub action: String,

    /// Classifications below this confidence are treated as unresolved.
    /// 0 disables the floor.
    #[serde(default)]
    pub confidence_floor: u8,
}

fn default_intent_agent() -> String {
    "router".into()
}
fn default_intent_action() -> String {
    "classify".into()
}

impl Default for IntentRouterConfig {
    fn default() -> Self {
        Self {
            agent: default_intent_agent(),
            action: default_intent_action(),
            confidence_floor: 0,
        }
    }
}

/// One remote capability agent.
#[derive(Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Base URL of the agent service.
    pub endpoint: String,

    /// Bearer token for the agent service (falls back to the root key).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-call timeout in milliseconds.
    #[serde(default = "default_agent_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_agent_timeout_ms() -> u64 {
    30_000
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Ordered steps for one intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// The intent identifier this workflow handles.
    pub intent: String,

    /// Ordered steps. Consecutive steps marked `parallel` form one batch.
    pub steps: Vec<StepConfig>,
}

/// One unit of work in a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Registered agent name.
    pub agent: String,

    /// Action sent to the agent.
    pub action: String,

    /// Whether this step may run concurrently with adjacent parallel steps.
    #[serde(default)]
    pub parallel: bool,

    /// Optional gate evaluated against earlier step outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionConfig>,

    /// Cache TTL in milliseconds. 0 means never cache.
    #[serde(default)]
    pub cache_ttl_ms: u64,

    /// Per-call timeout override; defaults to the agent's timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// An enumerated step predicate, composable with `all` / `any`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionConfig {
    /// An earlier step succeeded.
    Succeeded { step: String },
    /// An earlier step failed (or was skipped).
    Failed { step: String },
    /// An earlier step's output contains a substring.
    OutputContains { step: String, pattern: String },
    /// All sub-conditions hold (empty = vacuously true).
    All { of: Vec<ConditionConfig> },
    /// At least one sub-condition holds (empty = false).
    Any { of: Vec<ConditionConfig> },
}

impl ConditionConfig {
    /// Step names this condition (recursively) references.
    pub fn referenced_steps(&self) -> Vec<&str> {
        match self {
            Self::Succeeded { step } | Self::Failed { step } => vec![step.as_str()],
            Self::OutputContains { step, .. } => vec![step.as_str()],
            Self::All { of } | Self::Any { of } => {
                of.iter().flat_map(|c| c.referenced_steps()).collect()
            }
        }
    }
}

/// History-bounding rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruningConfig {
    /// Window size used for agents with no explicit rule.
    #[serde(default = "default_window")]
    pub default_window: usize,

    /// Per-agent rules, by registered agent name.
    #[serde(default)]
    pub rules: HashMap<String, PruningRuleConfig>,
}

fn default_window() -> usize {
    20
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            default_window: default_window(),
            rules: HashMap::new(),
        }
    }
}

/// One agent's pruning rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PruningRuleConfig {
    /// Keep the last `turns` turns.
    FixedWindow { turns: usize },
    /// Keep turns carrying a structural tag, capped at `max_turns`.
    Tagged {
        tag: String,
        #[serde(default = "default_tagged_max")]
        max_turns: usize,
    },
    /// Keep the full history. Use sparingly.
    Full,
}

fn default_tagged_max() -> usize {
    50
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum entry count before LRU eviction kicks in.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Interval of the background TTL sweep, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_cache_capacity() -> usize {
    1_024
}
fn default_sweep_interval() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Fire-and-forget persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Bounded queue size between request flows and the write worker.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Gateway bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8410
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific file path.
    ///
    /// A missing file yields the defaults; the `BRAINSTEM_API_KEY`
    /// environment variable overrides the root API key.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            toml::from_str::<Self>(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            tracing::info!("No config file found at {}, using defaults", path.display());
            Self::default()
        };

        if let Ok(key) = std::env::var("BRAINSTEM_API_KEY") {
            config.api_key = Some(key);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Cross-references between workflows and agents are checked here;
    /// condition ordering (conditions may only reference earlier steps)
    /// is checked when the workflow registry is built, which knows step
    /// positions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.intent.confidence_floor > 100 {
            return Err(ConfigError::ValidationError(
                "intent.confidence_floor must be at most 100".into(),
            ));
        }

        if self.cache.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "cache.capacity must be greater than zero".into(),
            ));
        }

        if self.pruning.default_window == 0 {
            return Err(ConfigError::ValidationError(
                "pruning.default_window must be greater than zero".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for workflow in &self.workflows {
            if !seen.insert(workflow.intent.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate workflow for intent '{}'",
                    workflow.intent
                )));
            }

            if workflow.steps.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "workflow '{}' has no steps",
                    workflow.intent
                )));
            }

            for step in &workflow.steps {
                if !self.agents.contains_key(&step.agent) {
                    return Err(ConfigError::ValidationError(format!(
                        "workflow '{}' references unknown agent '{}'",
                        workflow.intent, step.agent
                    )));
                }
            }
        }

        if !self.workflows.is_empty() && !self.agents.contains_key(&self.intent.agent) {
            return Err(ConfigError::ValidationError(format!(
                "intent router agent '{}' is not configured",
                self.intent.agent
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `brainstem init`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::sample()).unwrap_or_default()
    }

    /// A populated sample configuration: one classifier and the
    /// decision-support workflow, useful as an `init` starting point.
    pub fn sample() -> Self {
        let mut agents = HashMap::new();
        for name in [
            "router",
            "reflect",
            "record",
            "verify",
            "scan_assumptions",
            "check_consistency",
        ] {
            agents.insert(
                name.to_string(),
                AgentConfig {
                    endpoint: format!("http://localhost:9000/{name}"),
                    api_key: None,
                    timeout_ms: default_agent_timeout_ms(),
                },
            );
        }

        let mut rules = HashMap::new();
        rules.insert(
            "reflect".into(),
            PruningRuleConfig::FixedWindow { turns: 10 },
        );
        rules.insert(
            "record".into(),
            PruningRuleConfig::Tagged {
                tag: "decision".into(),
                max_turns: default_tagged_max(),
            },
        );
        rules.insert("check_consistency".into(), PruningRuleConfig::Full);

        Self {
            api_key: None,
            intent: IntentRouterConfig::default(),
            agents,
            workflows: vec![WorkflowConfig {
                intent: "deciding".into(),
                steps: vec![
                    StepConfig {
                        agent: "reflect".into(),
                        action: "reflect".into(),
                        parallel: false,
                        condition: None,
                        cache_ttl_ms: 120_000,
                        timeout_ms: None,
                    },
                    StepConfig {
                        agent: "record".into(),
                        action: "record".into(),
                        parallel: false,
                        condition: None,
                        cache_ttl_ms: 0,
                        timeout_ms: None,
                    },
                    StepConfig {
                        agent: "verify".into(),
                        action: "verify".into(),
                        parallel: true,
                        condition: None,
                        cache_ttl_ms: 120_000,
                        timeout_ms: None,
                    },
                    StepConfig {
                        agent: "scan_assumptions".into(),
                        action: "scan".into(),
                        parallel: true,
                        condition: None,
                        cache_ttl_ms: 120_000,
                        timeout_ms: None,
                    },
                    StepConfig {
                        agent: "check_consistency".into(),
                        action: "check".into(),
                        parallel: false,
                        condition: Some(ConditionConfig::Succeeded {
                            step: "record".into(),
                        }),
                        cache_ttl_ms: 0,
                        timeout_ms: None,
                    },
                ],
            }],
            pruning: PruningConfig {
                default_window: default_window(),
                rules,
            },
            cache: CacheConfig::default(),
            persistence: PersistenceConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            intent: IntentRouterConfig::default(),
            agents: HashMap::new(),
            workflows: vec![],
            pruning: PruningConfig::default(),
            cache: CacheConfig::default(),
            persistence: PersistenceConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
