//! # Action Translator Module
//!
//! Converts raw input events into semantic actions using the current
//! [`EventMap`].
//!
//! ## Event Types
//!
//! - **EV_KEY**: value `1` is a press, `0` a release; `2` (auto-repeat) is
//!   ignored so only real edges produce actions.
//! - **EV_ABS**: every value is run through the axis [`Hysteresis`]
//!   for the `min` endpoint first, then the `max` endpoint.
//!
//! Everything else (sync reports, relative motion, unmapped codes) yields
//! nothing.
//!
//! [`Hysteresis`]: super::hysteresis::Hysteresis
//!
//! ## Usage
//!
//! ```no_run
//! use evmapd::controller::translator::{translate, RawEvent, EventClass};
//! # let mut event_map = evmapd::mapping::EventMap::new(false);
//!
//! let event = RawEvent::new(EventClass::Key, 304, 1);
//! for action in translate(&event, &mut event_map) {
//!     println!("{} {}", action.spec.target, action.direction);
//! }
//! ```

use evdev::{EventType, InputEvent};

use crate::action::{Action, Direction};
use crate::mapping::{EventDescriptor, EventMap};

/// evdev key value for a release.
pub const KEY_UP: i32 = 0;
/// evdev key value for a press.
pub const KEY_DOWN: i32 = 1;
/// evdev key value for an auto-repeat of a held key.
pub const KEY_REPEAT: i32 = 2;

/// Event classes the translator distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Key,
    Absolute,
    Other,
}

/// A device event reduced to what translation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub class: EventClass,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    #[must_use]
    pub fn new(class: EventClass, code: u16, value: i32) -> Self {
        Self { class, code, value }
    }
}

impl From<&InputEvent> for RawEvent {
    fn from(event: &InputEvent) -> Self {
        let class = match event.event_type() {
            EventType::KEY => EventClass::Key,
            EventType::ABSOLUTE => EventClass::Absolute,
            _ => EventClass::Other,
        };
        Self::new(class, event.code(), event.value())
    }
}

impl From<InputEvent> for RawEvent {
    fn from(event: InputEvent) -> Self {
        Self::from(&event)
    }
}

/// Translates one raw event into zero or more actions.
///
/// Axis latches inside `event_map` are updated in place. When both axis
/// endpoints change on the same event, the `min` action comes first.
pub fn translate(event: &RawEvent, event_map: &mut EventMap) -> Vec<Action> {
    match event.class {
        EventClass::Key => translate_key(event, event_map).into_iter().collect(),
        EventClass::Absolute => translate_axis(event, event_map),
        EventClass::Other => Vec::new(),
    }
}

fn translate_key(event: &RawEvent, event_map: &EventMap) -> Option<Action> {
    let direction = match event.value {
        KEY_DOWN => Direction::Down,
        KEY_UP => Direction::Up,
        _ => return None,
    };
    match event_map.get(event.code) {
        Some(EventDescriptor::Button(button)) => Some(Action::new(button.press.clone(), direction)),
        _ => None,
    }
}

fn translate_axis(event: &RawEvent, event_map: &mut EventMap) -> Vec<Action> {
    let Some(EventDescriptor::Axis(axis)) = event_map.get_mut(event.code) else {
        return Vec::new();
    };

    let mut actions = Vec::new();
    if let Some(direction) = axis.hysteresis.update_min(event.value, &mut axis.min.state) {
        actions.push(Action::new(axis.min.action.clone(), direction));
    }
    if let Some(direction) = axis.hysteresis.update_max(event.value, &mut axis.max.state) {
        actions.push(Action::new(axis.max.action.clone(), direction));
    }
    actions
}
