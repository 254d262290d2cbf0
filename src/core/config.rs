use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bridge::backoff::RestartBackoff;
use crate::mapping::MappingContext;
use crate::messaging::correlation::DEFAULT_TRACE_TTL;

const CONFIG_PATH_ENV: &str = "BIFROST_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/bifrost.toml";

fn default_min_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    120_000
}

fn default_random_factor() -> f64 {
    0.2
}

fn default_trace_ttl_seconds() -> u64 {
    DEFAULT_TRACE_TTL.as_secs()
}

fn default_target_path() -> String {
    "/bridge/commands".to_string()
}

/// Top-level configuration for the Bifrost bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub correlation: CorrelationConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Ordered payload mapping contexts; later entries win on duplicate
    /// content-types.
    #[serde(default)]
    pub mappings: Vec<MappingContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Logical path the command-consuming service listens on.
    #[serde(default = "default_target_path")]
    pub target_path: String,
    /// Subject stamped into command headers unless the caller supplied one.
    #[serde(default)]
    pub authorization_subject: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            target_path: default_target_path(),
            authorization_subject: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_min_backoff_ms")]
    pub min_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Additional random delay on top of the exponential backoff, e.g. 0.2
    /// adds up to 20%. Pass 0 to skip jitter entirely.
    #[serde(default = "default_random_factor")]
    pub random_factor: f64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            min_backoff_ms: default_min_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            random_factor: default_random_factor(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorrelationConfig {
    #[serde(default = "default_trace_ttl_seconds")]
    pub trace_ttl_seconds: u64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            trace_ttl_seconds: default_trace_ttl_seconds(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from the path in `BIFROST_CONFIG`, defaulting to
    /// `config/bifrost.toml`.
    pub fn load_from_env() -> Result<Self> {
        let path = env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load(&path)
    }

    /// Load configuration from a specific file (TOML or JSON by extension).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let data = fs::read_to_string(path_ref)
            .with_context(|| format!("unable to read config {}", path_ref.display()))?;
        let config: Self = if is_json(path_ref) {
            serde_json::from_str(&data)
                .with_context(|| format!("invalid JSON config {}", path_ref.display()))?
        } else {
            toml::from_str(&data)
                .with_context(|| format!("invalid TOML config {}", path_ref.display()))?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.restart_backoff()
            .context("invalid supervisor backoff configuration")?;
        anyhow::ensure!(
            self.correlation.trace_ttl_seconds > 0,
            "correlation.trace_ttl_seconds must be positive"
        );
        anyhow::ensure!(
            !self.bridge.target_path.is_empty(),
            "bridge.target_path must not be empty"
        );
        for mapping in &self.mappings {
            anyhow::ensure!(
                !mapping.content_type.is_empty(),
                "mapping content_type must not be empty"
            );
            anyhow::ensure!(
                !mapping.mapping_engine.is_empty(),
                "mapping engine for content-type '{}' must not be empty",
                mapping.content_type
            );
        }
        Ok(())
    }

    pub fn restart_backoff(&self) -> Result<RestartBackoff> {
        RestartBackoff::new(
            Duration::from_millis(self.supervisor.min_backoff_ms),
            Duration::from_millis(self.supervisor.max_backoff_ms),
            self.supervisor.random_factor,
        )
        .map_err(anyhow::Error::from)
    }

    pub fn trace_ttl(&self) -> Duration {
        Duration::from_secs(self.correlation.trace_ttl_seconds)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(doc: &str) -> Config {
        toml::from_str(doc).unwrap()
    }

    #[test]
    fn defaults_apply_for_empty_config() {
        let config = parse("");
        assert_eq!(config.supervisor.min_backoff_ms, 1_000);
        assert_eq!(config.supervisor.max_backoff_ms, 120_000);
        assert_eq!(config.correlation.trace_ttl_seconds, 300);
        assert_eq!(config.bridge.target_path, "/bridge/commands");
        assert!(config.mappings.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_mapping_contexts_in_order() {
        let config = parse(
            r#"
            [[mappings]]
            content_type = "application/custom"
            mapping_engine = "canonical-json"

            [[mappings]]
            content_type = "application/sensor+json"
            mapping_engine = "wrapped-json"
            options = { topic = "sensors/env", path = "/readings" }
            "#,
        );
        assert_eq!(config.mappings.len(), 2);
        assert_eq!(config.mappings[0].content_type, "application/custom");
        assert_eq!(
            config.mappings[1].options.get("topic").map(String::as_str),
            Some("sensors/env")
        );
    }

    #[test]
    fn validate_rejects_inverted_backoff_bounds() {
        let config = parse(
            r#"
            [supervisor]
            min_backoff_ms = 5000
            max_backoff_ms = 100
            "#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_random_factor() {
        let config = parse(
            r#"
            [supervisor]
            random_factor = 1.5
            "#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_trace_ttl() {
        let config = parse(
            r#"
            [correlation]
            trace_ttl_seconds = 0
            "#,
        );
        assert!(config.validate().is_err());
    }
}
