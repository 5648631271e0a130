//! `brainstem init` — write a starter configuration file.

use anyhow::{bail, Context};
use std::path::Path;

pub fn run(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists — pass --force to overwrite",
            path.display()
        );
    }

    let toml = brainstem_config::AppConfig::default_toml();
    std::fs::write(path, toml)
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!("Wrote starter configuration to {}", path.display());
    println!("Edit the agent endpoints, then run `brainstem check`.");
    Ok(())
}
