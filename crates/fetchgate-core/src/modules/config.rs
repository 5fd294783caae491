use fetchgate_types::{ConfigError, ProxyConfig};
use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::utils::paths::get_data_dir;

const CONFIG_FILE: &str = "fetchgate.json";

/// Path of the config file inside the data directory.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(get_data_dir()?.join(CONFIG_FILE))
}

/// Load the proxy configuration from the data directory.
///
/// A missing file yields defaults; a present file must parse and validate.
pub fn load_config() -> Result<ProxyConfig, ConfigError> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<ProxyConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("[Config] {} not found, using defaults", path.display());
        return Ok(ProxyConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::Io { path: path.display().to_string(), message: e.to_string() })?;
    let config: ProxyConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse { message: e.to_string() })?;
    config.validate()?;

    Ok(config)
}

/// Save the proxy configuration to the data directory.
pub fn save_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    save_config_to(&config_path()?, config)
}

pub fn save_config_to(path: &Path, config: &ProxyConfig) -> Result<(), ConfigError> {
    config.validate()?;

    let io_err = |e: std::io::Error| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::Parse { message: e.to_string() })?;

    // Atomic write
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content).map_err(io_err)?;
    fs::rename(&temp_path, path).map_err(io_err)
}

/// Update specific fields in the config.
pub fn update_config<F>(updater: F) -> Result<ProxyConfig, ConfigError>
where
    F: FnOnce(&mut ProxyConfig),
{
    let mut config = load_config()?;
    updater(&mut config);
    save_config(&config)?;
    Ok(config)
}
