//! # Controller Module
//!
//! Input device handling.
//!
//! This module handles:
//! - Opening evdev devices and reading raw events
//! - Exclusive grab/ungrab of a device
//! - Translating raw events into semantic actions
//! - Axis hysteresis for analog inputs

pub mod device;
pub mod hysteresis;
pub mod translator;
