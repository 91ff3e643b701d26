//! Session state persistence for restoring open databases and query tabs between launches.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::config::config_dir;
use crate::connector::ConnectParams;
use crate::registry::ConnectionSpec;
use crate::workspace::WorkspaceSnapshot;

/// Current session file schema version.
const SESSION_VERSION: u32 = 1;

/// One database to reopen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEntry {
    /// Driver name; kept as text so one unknown driver doesn't void the whole file.
    pub driver: String,
    #[serde(default)]
    pub connect_params: ConnectParams,
}

impl From<ConnectionSpec> for DatabaseEntry {
    fn from(spec: ConnectionSpec) -> Self {
        Self {
            driver: spec.driver.name().to_string(),
            connect_params: spec.params,
        }
    }
}

/// Serializable session state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Databases that were open at shutdown, oldest first.
    #[serde(default)]
    pub databases: Vec<DatabaseEntry>,

    /// Query tabs; absent when the workspace was a single empty tab.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub queries: Option<WorkspaceSnapshot>,
}

impl SessionState {
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty() && self.queries.is_none()
    }
}

/// The session file format with versioning.
#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    version: u32,
    #[serde(flatten)]
    state: SessionState,
}

/// Returns the session file path (`<config_dir>/session.json`).
pub fn session_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("session.json"))
}

/// Load session state from a specific path.
///
/// A missing file is an empty session. A file written by a newer version is ignored.
pub fn load_session_from_path(path: &Path) -> Result<SessionState> {
    if !path.exists() {
        return Ok(SessionState::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session file: {}", path.display()))?;

    let file: SessionFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse session file: {}", path.display()))?;

    if file.version > SESSION_VERSION {
        tracing::warn!(
            version = file.version,
            path = %path.display(),
            "session file is from a newer koios; ignoring it"
        );
        return Ok(SessionState::default());
    }

    Ok(file.state)
}

/// Save session state to a specific path.
/// Uses atomic write (temp file + rename) to prevent corruption on crash.
pub fn save_session_to_path(state: &SessionState, path: &Path) -> Result<()> {
    let parent = path
        .parent()
        .context("Session path has no parent directory")?;

    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;

    let file = SessionFile {
        version: SESSION_VERSION,
        state: state.clone(),
    };

    let content = serde_json::to_string_pretty(&file).context("Failed to serialize session")?;

    let mut tmp = NamedTempFile::new_in(parent).with_context(|| {
        format!(
            "Failed to create temp session file in: {}",
            parent.display()
        )
    })?;

    tmp.write_all(content.as_bytes())
        .context("Failed to write temp session file")?;
    tmp.flush().context("Failed to flush temp session file")?;

    tmp.persist(path)
        .map_err(|e| anyhow::anyhow!("Failed to persist session file: {}", e))?;

    Ok(())
}
