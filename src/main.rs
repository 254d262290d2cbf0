//! Bifrost - unified CLI entrypoint.
//!
//! Usage:
//!   bifrost start --config config/bifrost.toml
//!   bifrost check --config config/bifrost.toml

use anyhow::Result;
use bifrost::cli::commands::{run_check, run_start};
use bifrost::cli::{Cli, Commands};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start(args) => run_start(args).await,
        Commands::Check(args) => run_check(args),
    }
}
