//! Subcommands.

pub mod batch;
pub mod config;
pub mod process;

use std::path::{Path, PathBuf};

use fapiao_core::models::config::FapiaoConfig;

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fapiao")
        .join("config.json")
}

/// Load the configuration from `--config`, else the default location, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FapiaoConfig> {
    if let Some(path) = config_path {
        return Ok(FapiaoConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        Ok(FapiaoConfig::from_file(&default_path)?)
    } else {
        Ok(FapiaoConfig::default())
    }
}
