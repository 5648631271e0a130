//! Brainstem CLI — the main entry point.
//!
//! Commands:
//! - `init`   — Write a starter configuration file
//! - `check`  — Load, validate, and summarize the configuration
//! - `serve`  — Start the coordination gateway

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "brainstem",
    about = "Brainstem — workflow coordination for capability agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "brainstem.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Load, validate, and summarize the configuration
    Check,

    /// Start the coordination gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init { force } => commands::init::run(&cli.config, force)?,
        Commands::Check => commands::check::run(&cli.config)?,
        Commands::Serve { port } => commands::serve::run(&cli.config, port).await?,
    }

    Ok(())
}
