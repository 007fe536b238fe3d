//! noteharvest CLI: incremental note harvesting.
//!
//! Captures every note behind a scrolling listing and keeps raw, readable,
//! Markdown, and rendered copies of each, reusing whatever a previous run
//! already produced.

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
