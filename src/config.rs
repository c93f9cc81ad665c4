//! # Configuration Module
//!
//! Handles loading and validating daemon settings from TOML files.
//!
//! Per-device event mappings live in separate JSON files handled by the
//! [`mapping`](crate::mapping) module; this file only says where to find
//! them and how the daemon itself behaves.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EvmapError, Result};

/// Name of the application directory under the user's config/runtime dirs
pub const APP_NAME: &str = "evmapd";

/// Log levels accepted in `[logging] level`
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub actions: ActionsConfig,
}

/// File system locations
#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_config_dir")]
    pub config_dir: String,

    #[serde(default = "default_socket_dir")]
    pub socket_dir: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for a daily rolling log file; empty disables file logging
    #[serde(default)]
    pub log_dir: String,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

/// Action execution configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ActionsConfig {
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            socket_dir: default_socket_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
            file_prefix: default_file_prefix(),
        }
    }
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
        }
    }
}

// Default value functions
fn default_config_dir() -> String {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .to_string_lossy()
        .into_owned()
}

fn default_socket_dir() -> String {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
        .to_string_lossy()
        .into_owned()
}

fn default_log_level() -> String { "info".to_string() }
fn default_file_prefix() -> String { "evmapd.log".to_string() }
fn default_shell() -> String { "/bin/sh".to_string() }

/// Default location of the settings file
#[must_use]
pub fn default_settings_path() -> PathBuf {
    PathBuf::from(default_config_dir()).join("evmapd.toml")
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use evmapd::config::Config;
    ///
    /// let config = Config::load("/etc/evmapd.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path` if it exists, defaults otherwise
    ///
    /// An explicitly requested file must exist; the default location may
    /// be missing.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = default_settings_path();
                if path.exists() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Directory holding per-device JSON configurations
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.config_dir)
    }

    /// Directory holding control sockets
    #[must_use]
    pub fn socket_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.socket_dir)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.paths.config_dir.is_empty() {
            return Err(EvmapError::Settings(
                toml::de::Error::custom("config_dir cannot be empty")
            ));
        }

        if self.paths.socket_dir.is_empty() {
            return Err(EvmapError::Settings(
                toml::de::Error::custom("socket_dir cannot be empty")
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(EvmapError::Settings(
                toml::de::Error::custom("log level must be one of: trace, debug, info, warn, error")
            ));
        }

        if !self.logging.log_dir.is_empty() && self.logging.file_prefix.is_empty() {
            return Err(EvmapError::Settings(
                toml::de::Error::custom("file_prefix cannot be empty when log_dir is set")
            ));
        }

        if self.actions.shell.is_empty() {
            return Err(EvmapError::Settings(
                toml::de::Error::custom("shell cannot be empty")
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> Config {
        Config {
            paths: PathsConfig {
                config_dir: "/home/user/.config/evmapd".to_string(),
                socket_dir: "/run/user/1000/evmapd".to_string(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                log_dir: String::new(),
                file_prefix: default_file_prefix(),
            },
            actions: ActionsConfig {
                shell: default_shell(),
            },
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.paths.config_dir.ends_with(APP_NAME));
        assert!(config.paths.socket_dir.ends_with(APP_NAME));
    }

    #[test]
    fn test_load_config_from_file() {
        let toml_content = r#"
[paths]
config_dir = "/etc/evmapd"

[logging]
level = "debug"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.config_dir(), PathBuf::from("/etc/evmapd"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.actions.shell, "/bin/sh");
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.log_dir.is_empty());
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[paths\nconfig_dir = ").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(EvmapError::Settings(_))));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = Config::load_or_default(Some(Path::new("/nonexistent/evmapd.toml")));
        assert!(matches!(result, Err(EvmapError::Io(_))));
    }

    #[test]
    fn test_load_validates() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[logging]\nlevel = \"loud\"\n").unwrap();
        temp_file.flush().unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_empty_config_dir() {
        let mut config = create_valid_config();
        config.paths.config_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_socket_dir() {
        let mut config = create_valid_config();
        config.paths.socket_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_log_levels() {
        for &level in LOG_LEVELS {
            let mut config = create_valid_config();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Log level {} should be valid", level);
        }
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_file_prefix_with_log_dir() {
        let mut config = create_valid_config();
        config.logging.log_dir = "/var/log/evmapd".to_string();
        config.logging.file_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_file_prefix_without_log_dir() {
        let mut config = create_valid_config();
        config.logging.file_prefix = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_shell() {
        let mut config = create_valid_config();
        config.actions.shell = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_file_prefix(), "evmapd.log");
        assert_eq!(default_shell(), "/bin/sh");
        assert!(default_settings_path().ends_with("evmapd/evmapd.toml"));
    }
}
