//! # Input Device Module
//!
//! Opens Linux input devices through evdev and exposes the operations the
//! event source needs behind the [`InputDevice`] trait.
//!
//! ## Non-blocking Reads
//!
//! Devices are switched to non-blocking mode on open. A read with nothing
//! pending fails with `WouldBlock`, which tells the multiplexer to wait for
//! the next readiness notification.

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

use evdev::{AbsoluteAxisType, Device};
use tracing::{debug, info};

use super::translator::RawEvent;
use crate::error::{EvmapError, Result};
use crate::mapping::{AxisCapability, ButtonCapability, DeviceCapabilities};

/// Operations the event source performs on its input device.
pub trait InputDevice: Send {
    /// Human-readable device name, used to derive the default configuration path.
    fn name(&self) -> &str;

    /// Descriptor that becomes readable when events are pending.
    fn raw_fd(&self) -> RawFd;

    /// Reads the batch of events currently available.
    fn read_events(&mut self) -> io::Result<Vec<RawEvent>>;

    /// Grabs the device exclusively.
    fn grab(&mut self) -> io::Result<()>;

    /// Releases an exclusive grab.
    fn ungrab(&mut self) -> io::Result<()>;
}

/// An evdev input device opened by path
pub struct EvdevInput {
    device: Device,
    device_path: String,
    name: String,
}

impl std::fmt::Debug for EvdevInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevInput")
            .field("device_path", &self.device_path)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl EvdevInput {
    /// Open an input device in non-blocking mode
    ///
    /// # Arguments
    ///
    /// * `path` - Device node (e.g., /dev/input/event3)
    ///
    /// # Errors
    ///
    /// Returns `Device` error if the node cannot be opened or configured
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use evmapd::controller::device::{EvdevInput, InputDevice};
    ///
    /// let device = EvdevInput::open("/dev/input/event3")?;
    /// println!("Opened {}", device.name());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let device = Device::open(path).map_err(EvmapError::Device)?;
        set_nonblocking(device.as_raw_fd()).map_err(EvmapError::Device)?;

        let name = device.name().unwrap_or("Unknown Device").to_string();
        let device_path = path.to_string_lossy().to_string();
        info!("Opened input device {} ({})", device_path, name);

        Ok(Self {
            device,
            device_path,
            name,
        })
    }

    /// Collects the buttons and absolute axes the device reports
    ///
    /// Names come from evdev (e.g. `BTN_SOUTH`, `ABS_X`), axis ranges from
    /// the kernel's absinfo.
    ///
    /// # Errors
    ///
    /// Returns `Device` error if the axis ranges cannot be queried
    pub fn capabilities(&self) -> Result<DeviceCapabilities> {
        let mut capabilities = DeviceCapabilities::default();

        if let Some(keys) = self.device.supported_keys() {
            for key in keys.iter() {
                capabilities.buttons.push(ButtonCapability {
                    name: format!("{:?}", key),
                    code: key.code(),
                });
            }
        }

        if let Some(axes) = self.device.supported_absolute_axes() {
            let abs_state = self.device.get_abs_state().map_err(EvmapError::Device)?;
            for axis in axes.iter() {
                let info = &abs_state[axis.0 as usize];
                capabilities.axes.push(AxisCapability {
                    name: axis_name(axis),
                    code: axis.0,
                    min: info.minimum,
                    max: info.maximum,
                });
            }
        }

        debug!(
            "{}: {} buttons, {} axes",
            self.device_path,
            capabilities.buttons.len(),
            capabilities.axes.len()
        );
        Ok(capabilities)
    }
}

fn axis_name(axis: AbsoluteAxisType) -> String {
    format!("{:?}", axis)
}

impl InputDevice for EvdevInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn raw_fd(&self) -> RawFd {
        self.device.as_raw_fd()
    }

    fn read_events(&mut self) -> io::Result<Vec<RawEvent>> {
        Ok(self.device.fetch_events()?.map(RawEvent::from).collect())
    }

    fn grab(&mut self) -> io::Result<()> {
        self.device.grab()
    }

    fn ungrab(&mut self) -> io::Result<()> {
        self.device.ungrab()
    }
}

/// Switch a descriptor to non-blocking mode, keeping its other flags
fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: fcntl on a descriptor we own; no pointers involved.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Descriptor reported by [`MockDevice`].
    pub const MOCK_DEVICE_FD: RawFd = 100;

    /// Mock input device for testing
    ///
    /// Clones share state, so a test can keep a handle after moving the
    /// device into an event source.
    #[derive(Clone)]
    pub struct MockDevice {
        pub name: String,
        pub batches: Arc<Mutex<VecDeque<io::Result<Vec<RawEvent>>>>>,
        pub grab_calls: Arc<Mutex<usize>>,
        pub ungrab_calls: Arc<Mutex<usize>>,
        pub grab_fails: Arc<Mutex<bool>>,
    }

    impl MockDevice {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                batches: Arc::new(Mutex::new(VecDeque::new())),
                grab_calls: Arc::new(Mutex::new(0)),
                ungrab_calls: Arc::new(Mutex::new(0)),
                grab_fails: Arc::new(Mutex::new(false)),
            }
        }

        pub fn push_batch(&self, events: Vec<RawEvent>) {
            self.batches.lock().unwrap().push_back(Ok(events));
        }

        pub fn push_error(&self, kind: io::ErrorKind) {
            self.batches
                .lock()
                .unwrap()
                .push_back(Err(io::Error::new(kind, "Mock read error")));
        }

        /// Makes subsequent grab and ungrab calls fail (calls are still counted)
        pub fn set_grab_fails(&self, fails: bool) {
            *self.grab_fails.lock().unwrap() = fails;
        }

        fn grab_result(&self) -> io::Result<()> {
            if *self.grab_fails.lock().unwrap() {
                Err(io::Error::from_raw_os_error(libc::EBUSY))
            } else {
                Ok(())
            }
        }

        pub fn grab_count(&self) -> usize {
            *self.grab_calls.lock().unwrap()
        }

        pub fn ungrab_count(&self) -> usize {
            *self.ungrab_calls.lock().unwrap()
        }
    }

    impl InputDevice for MockDevice {
        fn name(&self) -> &str {
            &self.name
        }

        fn raw_fd(&self) -> RawFd {
            MOCK_DEVICE_FD
        }

        fn read_events(&mut self) -> io::Result<Vec<RawEvent>> {
            self.batches
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(io::Error::from(io::ErrorKind::WouldBlock)))
        }

        fn grab(&mut self) -> io::Result<()> {
            *self.grab_calls.lock().unwrap() += 1;
            self.grab_result()
        }

        fn ungrab(&mut self) -> io::Result<()> {
            *self.ungrab_calls.lock().unwrap() += 1;
            self.grab_result()
        }
    }
}
