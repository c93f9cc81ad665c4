//! # evmapd Library
//!
//! Map buttons and analog axes of Linux input devices to user-defined
//! actions.
//!
//! This library provides the event source that reads device events,
//! translates them through a per-device JSON configuration, schedules
//! delayed actions and reloads configurations on request.

pub mod action;
pub mod config;
pub mod control;
pub mod controller;
pub mod error;
pub mod mapping;
pub mod scheduler;
pub mod source;
