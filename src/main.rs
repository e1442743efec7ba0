//! gkup - GKE env.yaml upgrade support CLI tool.
//!
//! Staged blue/green nodepool upgrades:
//! - Upgrade the control plane and non-active nodepools to a target version
//! - Verify, then switch active nodepools with `--switch-active-only`

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};

use gkup::app::{self, Outcome};
use gkup::config::{Args, Config};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    if let Err(e) = init_tracing(&args.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    debug!("Starting gkup - GKE Upgrade Support Tool");

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(args: Args) -> Result<()> {
    let config = Config::from_args(args)?;

    match app::run(&config).await? {
        Outcome::Written => debug!("Wrote {}", config.env_file.display()),
        Outcome::Unchanged => debug!("{} left unchanged", config.env_file.display()),
        Outcome::DryRun => debug!("Dry run, {} not written", config.env_file.display()),
    }

    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(log_level: &str) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to initialize log filter: {}", e))?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
