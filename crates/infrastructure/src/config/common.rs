//! Shared helpers and error types used across config modules.

use std::path::Path;

use tracing::warn;

// ── Config errors ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        Self::Yaml(e.to_string())
    }
}

// ── Shared serde defaults ──────────────────────────────────────────

pub(super) fn default_true() -> bool {
    true
}

// ── File checks ────────────────────────────────────────────────────

/// Log a warning if a file is world-readable (Unix only). The config
/// holds the provider API key. Returns whether the warning fired.
#[cfg(unix)]
pub(super) fn warn_if_world_readable(path: &Path, label: &str) -> bool {
    use std::os::unix::fs::PermissionsExt;
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    let mode = metadata.permissions().mode();
    if mode & 0o004 == 0 {
        return false;
    }
    warn!(
        path = %path.display(),
        mode = format!("{mode:04o}"),
        "{label} is world-readable, consider chmod 640 or stricter",
    );
    true
}

#[cfg(not(unix))]
pub(super) fn warn_if_world_readable(_path: &Path, _label: &str) -> bool {
    false
}
