//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Bifrost - supervised connectivity bridge between external messaging
/// transports and the internal command bus.
#[derive(Parser)]
#[command(name = "bifrost")]
#[command(version)]
#[command(about = "Bifrost connectivity bridge")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bridge
    Start(StartArgs),

    /// Validate a configuration file and exit
    Check(CheckArgs),
}

#[derive(Args)]
pub struct StartArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/bifrost.toml")]
    pub config: PathBuf,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/bifrost.toml")]
    pub config: PathBuf,
}
