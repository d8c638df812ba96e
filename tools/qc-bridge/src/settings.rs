//! Configuration loading for the CLI.

use anyhow::{Context, Result};
use qc_18_bridge_withdrawal::BridgeConfig;
use std::path::Path;
use tracing::info;

/// Load `path` (or defaults) and apply the API URL override.
pub fn load_config(path: Option<&Path>, api_url: Option<&str>) -> Result<BridgeConfig> {
    let mut config = match path {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => BridgeConfig::default(),
    };

    if let Some(url) = api_url {
        info!("Using bridge API {}", url);
        config.api.base_url = url.to_string();
    }

    config.validate().context("Invalid bridge configuration")?;
    Ok(config)
}
