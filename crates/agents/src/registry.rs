//! Agent registry — holds every configured capability agent by name.

use brainstem_core::CapabilityAgent;
use std::collections::HashMap;
use std::sync::Arc;

use crate::http::HttpAgent;

/// Maps registered names to capability agents.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn CapabilityAgent>>,
}

impl AgentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under a name.
    pub fn register(&mut self, name: impl Into<String>, agent: Arc<dyn CapabilityAgent>) {
        self.agents.insert(name.into(), agent);
    }

    /// Look up an agent by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn CapabilityAgent>> {
        self.agents.get(name).cloned()
    }

    /// Whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Build HTTP agents from configuration.
///
/// Each configured agent gets its own client; a missing per-agent key
/// falls back to the root API key.
pub fn build_from_config(config: &brainstem_config::AppConfig) -> AgentRegistry {
    let mut registry = AgentRegistry::new();

    for (name, agent_config) in &config.agents {
        let api_key = agent_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone());

        registry.register(
            name.clone(),
            Arc::new(HttpAgent::new(
                name.clone(),
                &agent_config.endpoint,
                api_key,
                agent_config.timeout_ms,
            )),
        );
    }

    registry
}
