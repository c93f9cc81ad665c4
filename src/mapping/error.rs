//! Classified errors raised while loading a device configuration.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// What went wrong while loading a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// The file does not exist.
    NotFound,
    /// The file exists but is not a valid configuration.
    Malformed(String),
    /// Any other failure (permissions, I/O, refusing to overwrite, ...).
    Other(String),
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigErrorKind::NotFound => write!(f, "File not found"),
            ConfigErrorKind::Malformed(detail) => write!(f, "Invalid JSON file: {}", detail),
            ConfigErrorKind::Other(detail) => write!(f, "{}", detail),
        }
    }
}

/// Error raised when a device configuration file cannot be loaded.
///
/// Carries the path that caused it so callers can report it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {kind}", path.display())]
pub struct ConfigError {
    /// Path of the configuration file that caused the error
    pub path: PathBuf,
    /// Classification of the failure
    pub kind: ConfigErrorKind,
}

impl ConfigError {
    pub fn new(path: impl Into<PathBuf>, kind: ConfigErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Classifies an I/O error raised while accessing `path`.
    pub fn from_io(path: &Path, err: &io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ConfigErrorKind::NotFound,
            _ => ConfigErrorKind::Other(err.to_string()),
        };
        Self::new(path, kind)
    }

    pub fn malformed(path: &Path, detail: impl Into<String>) -> Self {
        Self::new(path, ConfigErrorKind::Malformed(detail.into()))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ConfigErrorKind::NotFound
    }
}
