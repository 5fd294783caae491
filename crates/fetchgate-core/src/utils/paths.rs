use fetchgate_types::ConfigError;
use std::fs;
use std::path::PathBuf;

const DATA_DIR: &str = ".fetchgate";

/// Get data directory path.
///
/// Priority:
/// 1. `FETCHGATE_DATA_DIR` environment variable (for container deployments)
/// 2. `~/.fetchgate`
pub fn get_data_dir() -> Result<PathBuf, ConfigError> {
    let data_dir = if let Ok(custom_dir) = std::env::var("FETCHGATE_DATA_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = dirs::home_dir().ok_or_else(|| ConfigError::DataDir {
            message: "Cannot get home directory".to_string(),
        })?;
        home.join(DATA_DIR)
    };

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir).map_err(|e| ConfigError::Io {
            path: data_dir.display().to_string(),
            message: format!("Failed to create data directory: {}", e),
        })?;
    }

    Ok(data_dir)
}
