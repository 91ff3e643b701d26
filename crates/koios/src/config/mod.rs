//! Configuration module for koios.
//!
//! Handles loading configuration from:
//! - Default values
//! - Config file (~/.config/koios/config.toml, or `--config`)
//! - The `KOIOS_CONFIG_DIR` environment variable

mod keymap;
mod schema;

pub use keymap::{KeyBinding, Keymap};
pub use schema::{Config, KeyConfig, LogConfig, SessionConfig};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Returns the config directory path.
///
/// Checks `KOIOS_CONFIG_DIR` environment variable first, then falls back
/// to the system default (~/.config/koios on Linux).
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("KOIOS_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|p| p.join("koios"))
}

/// Returns the default config file path (~/.config/koios/config.toml)
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

/// Returns the log directory (~/.config/koios/logs)
pub fn log_dir() -> Option<PathBuf> {
    config_dir().map(|p| p.join("logs"))
}

/// Load configuration from the default path or return defaults
pub fn load_config() -> Result<Config> {
    match config_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Ok(Config::default()),
    }
}

/// Load configuration from a specific path
pub fn load_config_from(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}
