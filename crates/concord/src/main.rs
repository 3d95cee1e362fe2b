//! Concord - Entry Point
//!
//! Runs a coordination node: loads configuration, builds the coordination
//! context and waits for Ctrl-C / SIGTERM to perform coordinated shutdown.

// Force-link concord-providers so the linkme registrations are included
extern crate concord_providers;

use clap::Parser;

/// Command line interface for Concord
#[derive(Parser, Debug)]
#[command(name = "concord")]
#[command(about = "Concord - Distributed coordination node")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<std::path::PathBuf>,

    /// Deployment profile (overrides `shutdown.profile`)
    #[arg(short, long)]
    pub profile: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    concord::run(cli.config.as_deref(), cli.profile).await?;
    Ok(())
}
