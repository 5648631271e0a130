//! `brainstem serve` — start the coordination gateway.

use anyhow::Context;
use std::path::Path;
use tracing::info;

pub async fn run(path: &Path, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = brainstem_config::AppConfig::load_from(path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    if let Some(port) = port {
        config.gateway.port = port;
    }

    info!(
        workflows = config.workflows.len(),
        agents = config.agents.len(),
        "Starting Brainstem"
    );

    brainstem_gateway::start(config)
        .await
        .map_err(|e| anyhow::anyhow!("gateway failed: {e}"))
}
