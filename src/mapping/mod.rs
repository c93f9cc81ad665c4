//! # Mapping Module
//!
//! Per-device configuration: the JSON file format, the runtime event map
//! built from it, and default configuration generation.
//!
//! This module handles:
//! - Resolving default and named configuration paths
//! - Reading and validating configuration files
//! - Assigning action ids and initial axis latches
//! - Generating and saving a default configuration for a device

pub mod error;
pub mod generate;
pub mod loader;
pub mod types;

pub use error::{ConfigError, ConfigErrorKind};
pub use generate::{create, generate, AxisCapability, ButtonCapability, DeviceCapabilities};
pub use loader::{
    config_path, default_config_name, default_config_path, parse, read, save, EventMapLoader,
    JsonLoader,
};
pub use types::{
    ActionConfig, ActionKind, ActionSpec, AxisConfig, AxisDescriptor, AxisEndpoint,
    ButtonConfig, ButtonDescriptor, DeviceConfig, EventDescriptor, EventMap, Trigger, TriggerKind,
};

#[cfg(test)]
pub use loader::MockEventMapLoader;
