//! # Error Types
//!
//! Custom error types for evmapd using `thiserror`.

use std::io;
use std::os::unix::io::RawFd;

use thiserror::Error;

use crate::mapping::ConfigError;

/// Main error type for evmapd
#[derive(Debug, Error)]
pub enum EvmapError {
    /// Input device errors (read failures, disconnects, grab failures)
    #[error("Device error: {0}")]
    Device(#[source] io::Error),

    /// Control channel errors
    #[error("Control channel error: {0}")]
    Control(#[source] io::Error),

    /// Device configuration errors
    #[error("Device configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Daemon settings errors
    #[error("Settings error: {0}")]
    Settings(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A descriptor that belongs to neither the device nor the control channel
    #[error("Descriptor {0} does not belong to this event source")]
    UnknownDescriptor(RawFd),

    /// The event source was already cleaned up
    #[error("Event source already cleaned up")]
    Closed,
}

impl EvmapError {
    /// Returns true if the error only means "nothing left to read right now".
    #[must_use]
    pub fn is_would_block(&self) -> bool {
        match self {
            EvmapError::Device(e) | EvmapError::Control(e) | EvmapError::Io(e) => {
                e.kind() == io::ErrorKind::WouldBlock
            }
            _ => false,
        }
    }
}

/// Result type alias for evmapd
pub type Result<T> = std::result::Result<T, EvmapError>;
