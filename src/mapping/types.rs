//! # Event Map Types
//!
//! Two layers live here:
//!
//! - The on-disk configuration format ([`DeviceConfig`] and friends), a
//!   plain serde mirror of the JSON file.
//! - The runtime [`EventMap`] produced from it by
//!   [`parse`](super::loader::parse), keyed by event code and carrying the
//!   ids and latch states the event source needs.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::Direction;
use crate::controller::hysteresis::Hysteresis;

/// Firing policy of an action as written in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// Fire immediately on the qualifying transition.
    Normal,
    /// Fire only if the input stays activated for `delay_ms`.
    Delayed,
}

/// What an action does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Run `target` as a shell command line.
    Exec,
}

/// One action as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionConfig {
    pub trigger: TriggerKind,

    #[serde(rename = "type")]
    pub kind: ActionKind,

    pub target: String,

    /// Raw axis extreme (axis endpoints only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i32>,

    /// Hold time for delayed triggers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

/// Button section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ButtonConfig {
    pub alias: String,
    pub code: u16,
    pub press: ActionConfig,
}

/// Axis section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisConfig {
    pub alias: String,
    pub code: u16,
    pub min: ActionConfig,
    pub max: ActionConfig,
}

/// Complete per-device configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub grab: bool,

    #[serde(default)]
    pub buttons: Vec<ButtonConfig>,

    #[serde(default)]
    pub axes: Vec<AxisConfig>,
}

/// Resolved firing policy of a runtime action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Normal,
    Delayed(Duration),
}

/// A runtime action, unique within one [`EventMap`] by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
    /// Identifier used to cancel a pending delayed firing of this action.
    pub id: u32,
    pub trigger: Trigger,
    pub kind: ActionKind,
    pub target: String,
}

/// A mapped button.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonDescriptor {
    pub alias: String,
    pub code: u16,
    pub press: ActionSpec,
}

/// One extreme of an analog axis with its own latch.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisEndpoint {
    pub action: ActionSpec,
    /// Raw extreme reported by the device for this end of the axis.
    pub value: i32,
    /// Current latch; `Up` until the endpoint zone is entered.
    pub state: Direction,
}

/// A mapped absolute axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisDescriptor {
    pub alias: String,
    pub code: u16,
    pub min: AxisEndpoint,
    pub max: AxisEndpoint,
    /// Activation thresholds derived from `min.value` and `max.value`.
    pub hysteresis: Hysteresis,
}

/// Mapping entry for one event code.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDescriptor {
    Button(ButtonDescriptor),
    Axis(AxisDescriptor),
}

impl EventDescriptor {
    #[must_use]
    pub fn alias(&self) -> &str {
        match self {
            EventDescriptor::Button(button) => &button.alias,
            EventDescriptor::Axis(axis) => &axis.alias,
        }
    }
}

/// Parsed configuration for one device, keyed by event code.
///
/// Built wholesale by the loader and replaced, never patched, on reload.
/// Only the axis latches change after construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventMap {
    /// Whether the device should be grabbed exclusively.
    pub grab: bool,
    entries: HashMap<u16, EventDescriptor>,
}

impl EventMap {
    /// Creates an event map without any mapped events.
    #[must_use]
    pub fn new(grab: bool) -> Self {
        Self {
            grab,
            entries: HashMap::new(),
        }
    }

    /// Inserts a descriptor, handing it back if its code is already taken.
    pub(crate) fn insert(&mut self, descriptor: EventDescriptor) -> Option<EventDescriptor> {
        let code = match &descriptor {
            EventDescriptor::Button(button) => button.code,
            EventDescriptor::Axis(axis) => axis.code,
        };
        if self.entries.contains_key(&code) {
            return Some(descriptor);
        }
        self.entries.insert(code, descriptor);
        None
    }

    #[must_use]
    pub fn get(&self, code: u16) -> Option<&EventDescriptor> {
        self.entries.get(&code)
    }

    pub fn get_mut(&mut self, code: u16) -> Option<&mut EventDescriptor> {
        self.entries.get_mut(&code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
