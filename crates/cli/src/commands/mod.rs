pub mod ask;
pub mod config_cmd;
pub mod migrate;
pub mod serve;
pub mod tools;

use quranlens_config::AppConfig;
use std::path::Path;

/// Load config from `path` if given, else the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}
