pub mod config_cmd;
pub mod serve;
pub mod simulate;

use shamba_config::{AppConfig, ConfigError};
use std::path::PathBuf;

/// Load from an explicit path when given, else from the default location.
pub fn load_config(path: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::load_with_env(&path),
        None => AppConfig::load(),
    }
}
