//! # Configuration Loader
//!
//! Reads per-device JSON configuration files and turns them into an
//! [`EventMap`].
//!
//! ## Path Resolution
//!
//! - An empty name selects the device's default file,
//!   `<config_dir>/<sanitized device name>.json`.
//! - Any other name is reduced to its basename and looked up inside the
//!   configuration directory, so `../../etc/foo.json` reads
//!   `<config_dir>/foo.json`.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use evmapd::mapping::{config_path, EventMapLoader, JsonLoader};
//!
//! let path = config_path(Path::new("/home/me/.config/evmapd"), "Wireless Controller", "");
//! let event_map = JsonLoader.load(&path)?;
//! println!("{} mapped events", event_map.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use super::error::ConfigError;
use super::types::{
    ActionConfig, ActionSpec, AxisDescriptor, AxisEndpoint, ButtonDescriptor, DeviceConfig,
    EventDescriptor, EventMap, Trigger, TriggerKind,
};
use crate::action::Direction;
use crate::controller::hysteresis::Hysteresis;

/// Source of event maps for the event source.
///
/// The event source only ever asks for "the map stored at this path"; how
/// the file is read and validated is up to the implementation.
#[cfg_attr(test, mockall::automock)]
pub trait EventMapLoader: Send {
    /// Loads and parses the configuration stored at `path`.
    fn load(&self, path: &Path) -> Result<EventMap, ConfigError>;
}

/// Loads configuration files from disk as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLoader;

impl EventMapLoader for JsonLoader {
    fn load(&self, path: &Path) -> Result<EventMap, ConfigError> {
        let config = read(path)?;
        parse(config).map_err(|detail| ConfigError::malformed(path, detail))
    }
}

/// Returns the file name used for a device's default configuration.
///
/// Every character that is not a letter, digit or underscore is replaced
/// with a dot, e.g. `"Sony Wireless Controller"` becomes
/// `"Sony.Wireless.Controller.json"`.
#[must_use]
pub fn default_config_name(device_name: &str) -> String {
    let stem: String = device_name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '.' })
        .collect();
    format!("{}.json", stem)
}

/// Returns the path to a device's default configuration file.
#[must_use]
pub fn default_config_path(config_dir: &Path, device_name: &str) -> PathBuf {
    config_dir.join(default_config_name(device_name))
}

/// Resolves the configuration file requested by `name`.
///
/// An empty name selects the default configuration; anything else is
/// reduced to its basename inside `config_dir`.
#[must_use]
pub fn config_path(config_dir: &Path, device_name: &str, name: &str) -> PathBuf {
    if name.is_empty() {
        return default_config_path(config_dir, device_name);
    }
    match Path::new(name).file_name() {
        Some(basename) => config_dir.join(basename),
        // "..", "/" and friends have no basename; they resolve to the
        // directory itself and fail to load.
        None => config_dir.to_path_buf(),
    }
}

/// Reads the raw configuration document stored at `path`.
///
/// # Errors
///
/// - `NotFound` if the file does not exist
/// - `Malformed` if it is not a valid configuration document
/// - `Other` for any other I/O failure
pub fn read(path: &Path) -> Result<DeviceConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::from_io(path, &e))?;
    serde_json::from_str(&contents).map_err(|e| ConfigError::malformed(path, e.to_string()))
}

/// Writes `config` to `path`, creating the parent directory if needed.
pub fn save(path: &Path, config: &DeviceConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| ConfigError::from_io(dir, &e))?;
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::malformed(path, e.to_string()))?;
    fs::write(path, json + "\n").map_err(|e| ConfigError::from_io(path, &e))?;
    info!("Saved configuration to {}", path.display());
    Ok(())
}

/// Hands out action ids for one parse call.
#[derive(Debug, Default)]
struct IdSequence {
    next: u32,
}

impl IdSequence {
    fn take(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Turns a configuration document into an event map.
///
/// Ids are assigned from zero in document order: buttons first, then the
/// `min` and `max` endpoints of every axis. Axis latches start `Up`.
///
/// # Errors
///
/// Returns a description of the first invalid entry: a missing or
/// misplaced `value`/`delay_ms`, or an event code used twice.
pub fn parse(config: DeviceConfig) -> Result<EventMap, String> {
    let mut ids = IdSequence::default();
    let mut event_map = EventMap::new(config.grab);

    for button in config.buttons {
        if button.press.value.is_some() {
            return Err(format!("button {}: 'value' is only valid for axes", button.alias));
        }
        let press = action_spec(&button.alias, button.press, &mut ids)?;
        let descriptor = EventDescriptor::Button(ButtonDescriptor {
            alias: button.alias,
            code: button.code,
            press,
        });
        if let Some(rejected) = event_map.insert(descriptor) {
            return Err(duplicate_code(&rejected, button.code));
        }
    }

    for axis in config.axes {
        let min = axis_endpoint(&axis.alias, "min", axis.min, &mut ids)?;
        let max = axis_endpoint(&axis.alias, "max", axis.max, &mut ids)?;
        let hysteresis = Hysteresis::new(min.value, max.value);
        let descriptor = EventDescriptor::Axis(AxisDescriptor {
            alias: axis.alias,
            code: axis.code,
            min,
            max,
            hysteresis,
        });
        if let Some(rejected) = event_map.insert(descriptor) {
            return Err(duplicate_code(&rejected, axis.code));
        }
    }

    Ok(event_map)
}

fn duplicate_code(rejected: &EventDescriptor, code: u16) -> String {
    format!("{}: event code {} is mapped more than once", rejected.alias(), code)
}

fn axis_endpoint(
    alias: &str,
    limit: &str,
    config: ActionConfig,
    ids: &mut IdSequence,
) -> Result<AxisEndpoint, String> {
    let value = config
        .value
        .ok_or_else(|| format!("axis {} {}: missing 'value'", alias, limit))?;
    let action = action_spec(alias, config, ids)?;
    Ok(AxisEndpoint {
        action,
        value,
        state: Direction::Up,
    })
}

fn action_spec(alias: &str, config: ActionConfig, ids: &mut IdSequence) -> Result<ActionSpec, String> {
    let trigger = match (config.trigger, config.delay_ms) {
        (TriggerKind::Normal, None) => Trigger::Normal,
        (TriggerKind::Delayed, Some(ms)) => Trigger::Delayed(Duration::from_millis(ms)),
        (TriggerKind::Normal, Some(_)) => {
            return Err(format!("{}: 'delay_ms' requires a delayed trigger", alias));
        }
        (TriggerKind::Delayed, None) => {
            return Err(format!("{}: delayed trigger requires 'delay_ms'", alias));
        }
    };
    Ok(ActionSpec {
        id: ids.take(),
        trigger,
        kind: config.kind,
        target: config.target,
    })
}
