//! Check command - validates a configuration file without starting anything.

use crate::cli::args::CheckArgs;
use crate::core::config::Config;
use crate::mapping::{EngineCatalog, MapperRegistry};
use anyhow::{Context, Result};

pub fn run_check(args: CheckArgs) -> Result<()> {
    let config = Config::load(&args.config)
        .with_context(|| format!("configuration {} is invalid", args.config.display()))?;
    let catalog = EngineCatalog::with_builtins();
    let registry = MapperRegistry::from_contexts(&catalog, &config.mappings);
    if registry.len() < config.mappings.len() {
        anyhow::bail!(
            "{} of {} mapping contexts failed to construct or were shadowed by duplicates",
            config.mappings.len() - registry.len(),
            config.mappings.len()
        );
    }
    println!(
        "ok: target={} mappers={} min_backoff={}ms max_backoff={}ms",
        config.bridge.target_path,
        registry.len(),
        config.supervisor.min_backoff_ms,
        config.supervisor.max_backoff_ms
    );
    Ok(())
}
