//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Session persistence settings
    pub session: SessionConfig,
    /// Log settings
    pub log: LogConfig,
    /// Key binding overrides, applied over the defaults
    pub keys: Vec<KeyConfig>,
}

/// Session persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Restore open databases and query tabs on startup and save them on quit
    pub persist: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { persist: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. "info,koios=debug"
    pub filter: Option<String>,
}

/// A key binding override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Key name (e.g., "Ctrl+E", "Rune[?]", "F5")
    pub key: String,
    /// Operation name (e.g., "exec-query")
    pub operation: String,
}

impl KeyConfig {
    pub fn new(key: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operation: operation.into(),
        }
    }
}
