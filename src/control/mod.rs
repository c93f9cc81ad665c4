//! # Control Channel Module
//!
//! Handles configuration reload requests sent to a running daemon.
//!
//! This module handles:
//! - Binding one Unix datagram socket per device
//! - Receiving one newline-terminated command per datagram
//! - Removing the socket file on close
//! - Sending reload requests from the command line
//!
//! ## Protocol
//!
//! | Datagram | Meaning |
//! |----------|---------|
//! | `"\n"` | Reload the device's default configuration |
//! | `"name.json\n"` | Load `name.json` from the configuration directory |
//!
//! Nothing is sent back; the outcome is only visible in the daemon log.

pub mod channel_trait;

pub use channel_trait::ControlChannel;

use std::fs;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{EvmapError, Result};

/// Largest command accepted in one datagram
pub const MAX_COMMAND_LEN: usize = 4096;

/// Returns the control socket path for a device node
///
/// The socket is named after the node's file name, e.g.
/// `/dev/input/event3` maps to `<socket_dir>/event3`.
#[must_use]
pub fn socket_path(socket_dir: &Path, device_path: &Path) -> PathBuf {
    match device_path.file_name() {
        Some(name) => socket_dir.join(name),
        None => socket_dir.join("evmapd"),
    }
}

/// Control socket bound to a path on the file system
pub struct UnixControlSocket {
    socket: Option<UnixDatagram>,
    path: PathBuf,
}

impl std::fmt::Debug for UnixControlSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixControlSocket")
            .field("path", &self.path)
            .field("open", &self.socket.is_some())
            .finish()
    }
}

impl UnixControlSocket {
    /// Bind a non-blocking control socket at `path`
    ///
    /// Creates the parent directory if needed and replaces a stale socket
    /// file left behind by a previous run.
    ///
    /// # Errors
    ///
    /// Returns `Control` error if the directory cannot be created or the
    /// socket cannot be bound
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use evmapd::control::UnixControlSocket;
    ///
    /// let socket = UnixControlSocket::bind("/run/user/1000/evmapd/event3")?;
    /// # drop(socket);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn bind<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                EvmapError::Control(io::Error::new(
                    e.kind(),
                    format!("Failed to create {}: {}", dir.display(), e),
                ))
            })?;
        }

        if path.exists() {
            debug!("Removing stale control socket {}", path.display());
            fs::remove_file(path).map_err(EvmapError::Control)?;
        }

        let socket = UnixDatagram::bind(path).map_err(|e| {
            EvmapError::Control(io::Error::new(
                e.kind(),
                format!("Failed to bind {}: {}", path.display(), e),
            ))
        })?;
        socket.set_nonblocking(true).map_err(EvmapError::Control)?;

        info!("Control socket listening at {}", path.display());
        Ok(Self {
            socket: Some(socket),
            path: path.to_path_buf(),
        })
    }
}

impl ControlChannel for UnixControlSocket {
    fn raw_fd(&self) -> RawFd {
        self.socket.as_ref().map_or(-1, AsRawFd::as_raw_fd)
    }

    fn recv_line(&mut self) -> io::Result<String> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "control socket closed"))?;

        let mut buf = [0u8; MAX_COMMAND_LEN];
        let len = socket.recv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf[..len]).into_owned())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.socket.take().is_none() {
            return Ok(());
        }
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            // Already removed by someone else
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Control socket {} already removed", self.path.display());
            }
            Err(e) => return Err(e),
        }
        debug!("Closed control socket {}", self.path.display());
        Ok(())
    }
}

/// Send a reload request to a running daemon
///
/// An empty `name` requests the default configuration.
///
/// # Errors
///
/// Returns `Control` error if the daemon's socket cannot be reached
///
/// # Examples
///
/// ```no_run
/// use evmapd::control::send_reload;
///
/// send_reload("/run/user/1000/evmapd/event3", "racing.json")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn send_reload<P: AsRef<Path>>(socket_path: P, name: &str) -> Result<()> {
    let socket_path = socket_path.as_ref();
    let socket = UnixDatagram::unbound().map_err(EvmapError::Control)?;
    let command = format!("{}\n", name);
    socket
        .send_to(command.as_bytes(), socket_path)
        .map_err(|e| {
            EvmapError::Control(io::Error::new(
                e.kind(),
                format!("Failed to reach {}: {}", socket_path.display(), e),
            ))
        })?;
    debug!("Sent reload request {:?} to {}", name, socket_path.display());
    Ok(())
}
