//! Start command - runs the bridge until interrupted.

use crate::cli::args::StartArgs;
use crate::core::config::Config;
use crate::mapping::{EngineCatalog, MapperRegistry};
use crate::ops::telemetry;
use anyhow::Result;
use std::env;
use std::sync::Arc;

pub async fn run_start(args: StartArgs) -> Result<()> {
    // Set config path via environment so Config::load_from_env picks it up
    env::set_var("BIFROST_CONFIG", args.config.display().to_string());

    let config = Config::load_from_env()?;
    let _log_handle = telemetry::init_tracing(config.telemetry.log_level.as_deref())?;

    let catalog = EngineCatalog::with_builtins();
    let registry = Arc::new(MapperRegistry::from_contexts(&catalog, &config.mappings));
    tracing::info!(
        "bridge configured, target={} mappers={} trace_ttl={:?}",
        config.bridge.target_path,
        registry.len(),
        config.trace_ttl()
    );

    // Transport drivers register their supervisors against this registry
    // and bus wiring through the library API; the binary itself only hosts
    // the shared pieces and stays up until interrupted.
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    Ok(())
}
