//! Bifrost CLI - unified command-line interface.
//!
//! Provides a single binary entry point for:
//! - `bifrost start` - Run the bridge
//! - `bifrost check` - Validate a configuration file

mod args;
pub mod commands;

pub use args::{CheckArgs, Cli, Commands, StartArgs};
