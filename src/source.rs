//! # Event Source
//!
//! Owns one input device, its control channel and the current event map,
//! and turns readiness of either descriptor into actions.
//!
//! ## Lifecycle
//!
//! ```text
//! new() ──► grabbed / ungrabbed (follows each loaded map) ──► cleanup()
//! ```
//!
//! ## Dispatch
//!
//! The multiplexer calls [`EventSource::process`] with whichever
//! descriptor became readable:
//!
//! - **Device**: one batch of events is read and translated. Normal
//!   actions are returned in order; delayed actions are armed on press and
//!   cancelled on release.
//! - **Control**: one command line is read and the requested configuration
//!   is loaded. A failed load is logged and changes nothing.
//!
//! Delayed actions come back through [`EventSource::fire_due`], driven by
//! a timer set to [`EventSource::next_deadline`].

use std::os::unix::io::RawFd;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::action::{Action, Direction};
use crate::control::ControlChannel;
use crate::controller::device::InputDevice;
use crate::controller::translator::translate;
use crate::error::{EvmapError, Result};
use crate::mapping::{config_path, EventMap, EventMapLoader, Trigger};
use crate::scheduler::ActionScheduler;

/// Event source for one input device.
pub struct EventSource {
    device: Option<Box<dyn InputDevice>>,
    control: Option<Box<dyn ControlChannel>>,
    loader: Box<dyn EventMapLoader>,
    config_dir: PathBuf,
    device_name: String,
    event_map: EventMap,
    scheduler: ActionScheduler,
    /// Actual grab state of the device, reconciled against `event_map.grab`.
    grabbed: bool,
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("device_name", &self.device_name)
            .field("config_dir", &self.config_dir)
            .field("grabbed", &self.grabbed)
            .field("mapped_events", &self.event_map.len())
            .field("pending_actions", &self.scheduler.len())
            .finish_non_exhaustive()
    }
}

impl EventSource {
    /// Creates an event source and loads the device's default configuration.
    ///
    /// The device is grabbed right away if the configuration asks for it.
    ///
    /// # Errors
    ///
    /// Returns `Config` error if the default configuration cannot be loaded.
    /// The control channel is closed before returning.
    pub fn new(
        device: Box<dyn InputDevice>,
        mut control: Box<dyn ControlChannel>,
        loader: Box<dyn EventMapLoader>,
        config_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let config_dir = config_dir.into();
        let device_name = device.name().to_string();
        let path = config_path(&config_dir, &device_name, "");

        let event_map = match loader.load(&path) {
            Ok(event_map) => event_map,
            Err(e) => {
                if let Err(close_err) = control.close() {
                    warn!("{}: failed to close control channel: {}", device_name, close_err);
                }
                return Err(EvmapError::Config(e));
            }
        };

        let mut source = Self {
            device: Some(device),
            control: Some(control),
            loader,
            config_dir,
            device_name,
            event_map: EventMap::default(),
            scheduler: ActionScheduler::new(),
            grabbed: false,
        };
        source.install(event_map);
        Ok(source)
    }

    #[must_use]
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Descriptor of the input device, if not cleaned up.
    #[must_use]
    pub fn device_fd(&self) -> Option<RawFd> {
        self.device.as_ref().map(|device| device.raw_fd())
    }

    /// Descriptor of the control channel, if not cleaned up.
    #[must_use]
    pub fn control_fd(&self) -> Option<RawFd> {
        self.control.as_ref().map(|control| control.raw_fd())
    }

    /// The event map currently in effect.
    #[must_use]
    pub fn event_map(&self) -> &EventMap {
        &self.event_map
    }

    /// Whether the device is currently grabbed.
    #[must_use]
    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    /// Earliest deadline of a pending delayed action.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Handles readiness of one of this source's descriptors.
    ///
    /// Returns the actions to execute, in the order the device reported
    /// the underlying events. Control commands never produce actions.
    ///
    /// # Errors
    ///
    /// - `Device` if reading the device fails (`WouldBlock` included, so the
    ///   caller knows to wait for the next notification)
    /// - `Control` if reading the control channel fails
    /// - `UnknownDescriptor` if `fd` belongs to neither
    /// - `Closed` after [`cleanup`](Self::cleanup)
    pub fn process(&mut self, fd: RawFd) -> Result<Vec<Action>> {
        if self.device.is_none() && self.control.is_none() {
            return Err(EvmapError::Closed);
        }
        if self.device_fd() == Some(fd) {
            return self.process_device(Instant::now());
        }
        if self.control_fd() == Some(fd) {
            self.process_control()?;
            return Ok(Vec::new());
        }
        Err(EvmapError::UnknownDescriptor(fd))
    }

    /// Returns the delayed actions whose deadline has passed.
    pub fn fire_due(&mut self, now: Instant) -> Vec<Action> {
        self.scheduler
            .tick(now)
            .into_iter()
            .map(Action::down)
            .collect()
    }

    fn process_device(&mut self, now: Instant) -> Result<Vec<Action>> {
        let device = self.device.as_mut().ok_or(EvmapError::Closed)?;
        let events = device.read_events().map_err(EvmapError::Device)?;

        let mut actions = Vec::new();
        for event in &events {
            for action in translate(event, &mut self.event_map) {
                debug!(
                    "{}: action {} {} ({})",
                    self.device_name, action.spec.id, action.direction, action.spec.target
                );
                match (action.spec.trigger, action.direction) {
                    (Trigger::Normal, _) => actions.push(action),
                    (Trigger::Delayed(delay), Direction::Down) => {
                        self.scheduler.arm(action.spec, delay, now);
                    }
                    (Trigger::Delayed(_), Direction::Up) => {
                        self.scheduler.cancel(action.spec.id);
                    }
                }
            }
        }
        Ok(actions)
    }

    fn process_control(&mut self) -> Result<()> {
        let control = self.control.as_mut().ok_or(EvmapError::Closed)?;
        let line = control.recv_line().map_err(EvmapError::Control)?;
        let name = line.trim();

        let path = config_path(&self.config_dir, &self.device_name, name);
        match self.loader.load(&path) {
            Ok(event_map) => {
                info!("{}: loaded {}", self.device_name, path.display());
                self.install(event_map);
            }
            Err(e) => {
                error!("{}: {}", self.device_name, e);
            }
        }
        Ok(())
    }

    /// Replaces the event map and brings the grab state in line with it.
    fn install(&mut self, event_map: EventMap) {
        self.scheduler.clear();
        self.event_map = event_map;
        self.reconcile_grab();
    }

    fn reconcile_grab(&mut self) {
        let Some(device) = self.device.as_mut() else {
            return;
        };
        match (self.event_map.grab, self.grabbed) {
            (true, false) => match device.grab() {
                Ok(()) => {
                    info!("{}: grabbed device", self.device_name);
                    self.grabbed = true;
                }
                Err(e) => warn!("{}: failed to grab device: {}", self.device_name, e),
            },
            (false, true) => match device.ungrab() {
                Ok(()) => {
                    info!("{}: released device", self.device_name);
                    self.grabbed = false;
                }
                Err(e) => warn!("{}: failed to release device: {}", self.device_name, e),
            },
            _ => {}
        }
    }

    /// Releases the control channel and the device.
    ///
    /// The control socket is closed and its file removed, a grabbed device
    /// is released, and pending delayed actions are dropped. Failures are
    /// logged, never returned. Further calls do nothing.
    pub fn cleanup(&mut self) {
        self.scheduler.clear();

        if let Some(mut control) = self.control.take() {
            if let Err(e) = control.close() {
                warn!("{}: failed to close control channel: {}", self.device_name, e);
            }
        }

        if let Some(mut device) = self.device.take() {
            if self.grabbed {
                if let Err(e) = device.ungrab() {
                    warn!("{}: failed to release device: {}", self.device_name, e);
                }
                self.grabbed = false;
            }
            debug!("{}: closed device", self.device_name);
        }
    }

    /// Returns the path a control command would load.
    #[must_use]
    pub fn resolve(&self, name: &str) -> PathBuf {
        config_path(&self.config_dir, &self.device_name, name)
    }
}

impl Drop for EventSource {
    fn drop(&mut self) {
        self.cleanup();
    }
}
