//! `brainstem check` — load, validate, and summarize the configuration.
//!
//! Runs the same validation the gateway runs at startup, including the
//! workflow registry build, then prints each workflow's batch plan.

use anyhow::Context;
use brainstem_coordinator::WorkflowRegistry;
use std::path::Path;

pub fn run(path: &Path) -> anyhow::Result<()> {
    let config = brainstem_config::AppConfig::load_from(path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let agents = brainstem_agents::build_from_config(&config);
    let registry = WorkflowRegistry::from_config(&config, &agents)
        .context("workflow validation failed")?;

    println!("Configuration OK: {}", path.display());
    println!("  agents:    {}", agents.len());
    println!("  workflows: {}", registry.len());

    for intent in registry.intents() {
        let workflow = registry.resolve(intent).expect("intent just listed");
        println!("\n  {} ({} steps)", intent, workflow.steps.len());
        for (batch_number, batch) in workflow.batches().iter().enumerate() {
            let members: Vec<String> = batch
                .iter()
                .map(|&i| {
                    let step = &workflow.steps[i];
                    format!("{}:{}", step.agent, step.action)
                })
                .collect();
            let mode = if batch.len() > 1 { "parallel" } else { "sequential" };
            println!(
                "    batch {} ({mode}): {}",
                batch_number + 1,
                members.join(", ")
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_accepts_starter_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brainstem.toml");
        std::fs::write(&path, brainstem_config::AppConfig::default_toml()).unwrap();

        run(&path).unwrap();
    }

    #[test]
    fn check_rejects_bad_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brainstem.toml");
        std::fs::write(
            &path,
            r#"
[agents.router]
endpoint = "http://localhost:9000/router"

[[workflows]]
intent = "deciding"

[[workflows.steps]]
agent = "ghost"
action = "spook"
"#,
        )
        .unwrap();

        assert!(run(&path).is_err());
    }
}
