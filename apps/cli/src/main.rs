//! Leadline CLI: counselor prospecting, enrichment, and outreach.
//!
//! Finds counselors on a public directory, discovers their contact email,
//! sends a templated introduction, and tracks the replies.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
