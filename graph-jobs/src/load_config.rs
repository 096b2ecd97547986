/// `load_config` module: loads the static YAML config and applies environment overrides.
///
/// # Responsibilities
/// - Parse the user-supplied YAML file into [`CliConfig`]
/// - Apply `GRAPH_API_BASE_URL` over the file's base URL
/// - Validate polling budgets before any request is made
///
/// Secrets are never read from the file; the API key comes from `GRAPH_API_KEY` when the
/// transport is constructed (see [`crate::transport::HttpTransport::from_env`]).
///
/// # Errors
/// All errors use `anyhow::Error` for context-rich diagnostics and surface at the CLI boundary.
use anyhow::{Context, Result};
use graph_jobs_core::config::PollingConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const DEFAULT_BASE_URL: &str = "https://api.supermodeltools.com";
pub const BASE_URL_ENV: &str = "GRAPH_API_BASE_URL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub api: ApiSection,
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    /// Per-request HTTP timeout. Unset means no limit beyond the polling budget.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: None,
        }
    }
}

/// Loads the config file at `path`, or the defaults when no path is given.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<CliConfig> {
    let mut config = match path {
        Some(path) => read_config_file(path.as_ref())?,
        None => {
            info!("No config file given, using defaults");
            CliConfig::default()
        }
    };

    if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
        if !base_url.is_empty() {
            info!(base_url = %base_url, "Base URL overridden from environment");
            config.api.base_url = base_url;
        }
    }

    config
        .polling
        .validate()
        .context("Invalid polling configuration")?;
    config.polling.trace_loaded();
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<CliConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;

    let config: CliConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;

    info!(config_path = ?path, "Parsed config YAML successfully");
    Ok(config)
}
