//! Default configuration generation from device capabilities.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::error::{ConfigError, ConfigErrorKind};
use super::loader::{default_config_path, save};
use super::types::{ActionConfig, ActionKind, AxisConfig, ButtonConfig, DeviceConfig, TriggerKind};

/// A key or button reported by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonCapability {
    pub name: String,
    pub code: u16,
}

/// An absolute axis reported by the device, with its raw range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisCapability {
    pub name: String,
    pub code: u16,
    pub min: i32,
    pub max: i32,
}

/// Everything the generator needs to know about a device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceCapabilities {
    pub buttons: Vec<ButtonCapability>,
    pub axes: Vec<AxisCapability>,
}

fn echo_action(target: String, value: Option<i32>) -> ActionConfig {
    ActionConfig {
        trigger: TriggerKind::Normal,
        kind: ActionKind::Exec,
        target,
        value,
        delay_ms: None,
    }
}

/// Generates a configuration that echoes the name of every input.
///
/// Buttons run `echo <name>`, axes run `echo <name> min` and
/// `echo <name> max`. The device is not grabbed. Axes whose code is
/// already taken by a button are left out so the result always loads.
#[must_use]
pub fn generate(capabilities: &DeviceCapabilities) -> DeviceConfig {
    let mut taken = HashSet::new();

    let buttons: Vec<ButtonConfig> = capabilities
        .buttons
        .iter()
        .filter(|button| taken.insert(button.code))
        .map(|button| ButtonConfig {
            alias: button.name.clone(),
            code: button.code,
            press: echo_action(format!("echo {}", button.name), None),
        })
        .collect();

    let mut axes = Vec::with_capacity(capabilities.axes.len());
    for axis in &capabilities.axes {
        if !taken.insert(axis.code) {
            warn!("Skipping axis {}: code {} already mapped", axis.name, axis.code);
            continue;
        }
        axes.push(AxisConfig {
            alias: axis.name.clone(),
            code: axis.code,
            min: echo_action(format!("echo {} min", axis.name), Some(axis.min)),
            max: echo_action(format!("echo {} max", axis.name), Some(axis.max)),
        });
    }

    DeviceConfig {
        grab: false,
        buttons,
        axes,
    }
}

/// Generates and saves the default configuration for a device.
///
/// Returns the path written to.
///
/// # Errors
///
/// Refuses to overwrite an existing file, otherwise fails only if saving
/// fails.
pub fn create(
    config_dir: &Path,
    device_name: &str,
    capabilities: &DeviceCapabilities,
) -> Result<PathBuf, ConfigError> {
    let path = default_config_path(config_dir, device_name);
    if path.exists() {
        return Err(ConfigError::new(
            &path,
            ConfigErrorKind::Other("already exists, not overwriting".to_string()),
        ));
    }
    save(&path, &generate(capabilities))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::loader::{parse, read};
    use tempfile::tempdir;

    fn gamepad() -> DeviceCapabilities {
        DeviceCapabilities {
            buttons: vec![
                ButtonCapability { name: "BTN_SOUTH".to_string(), code: 304 },
                ButtonCapability { name: "BTN_EAST".to_string(), code: 305 },
            ],
            axes: vec![AxisCapability {
                name: "ABS_X".to_string(),
                code: 0,
                min: 0,
                max: 255,
            }],
        }
    }

    #[test]
    fn test_generate_echo_actions() {
        let config = generate(&gamepad());

        assert!(!config.grab);
        assert_eq!(config.buttons.len(), 2);
        assert_eq!(config.buttons[0].alias, "BTN_SOUTH");
        assert_eq!(config.buttons[0].press.target, "echo BTN_SOUTH");
        assert_eq!(config.buttons[0].press.trigger, TriggerKind::Normal);

        assert_eq!(config.axes.len(), 1);
        assert_eq!(config.axes[0].min.target, "echo ABS_X min");
        assert_eq!(config.axes[0].min.value, Some(0));
        assert_eq!(config.axes[0].max.target, "echo ABS_X max");
        assert_eq!(config.axes[0].max.value, Some(255));
    }

    #[test]
    fn test_generated_config_parses() {
        let event_map = parse(generate(&gamepad())).unwrap();
        assert_eq!(event_map.len(), 3);
    }

    #[test]
    fn test_generate_skips_colliding_axis() {
        let mut caps = gamepad();
        caps.buttons.push(ButtonCapability { name: "KEY_RESERVED".to_string(), code: 0 });

        let config = generate(&caps);
        assert!(config.axes.is_empty());
        assert!(parse(config).is_ok());
    }

    #[test]
    fn test_create_writes_default_file() {
        let dir = tempdir().unwrap();
        let path = create(dir.path(), "Foo Bar", &gamepad()).unwrap();

        assert_eq!(path, dir.path().join("Foo.Bar.json"));
        assert_eq!(read(&path).unwrap(), generate(&gamepad()));
    }

    #[test]
    fn test_create_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        create(dir.path(), "Foo Bar", &gamepad()).unwrap();

        let err = create(dir.path(), "Foo Bar", &DeviceCapabilities::default()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        // Original content untouched
        let path = dir.path().join("Foo.Bar.json");
        assert_eq!(read(&path).unwrap(), generate(&gamepad()));
    }
}
