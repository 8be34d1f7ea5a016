//! Configuration errors

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading settings or instruction files
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed YAML{}: {source}", located(.path))]
    Yaml {
        path: Option<PathBuf>,
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid configuration in {}: {message}", .path.display())]
    InvalidFile { path: PathBuf, message: String },
}

fn located(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

impl ConfigError {
    /// Attach the file the error came from
    pub fn with_path(self, path: &Path) -> Self {
        match self {
            ConfigError::Yaml { source, .. } => ConfigError::Yaml {
                path: Some(path.to_path_buf()),
                source,
            },
            ConfigError::Invalid(message) => ConfigError::InvalidFile {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        }
    }
}
