//! Trait abstraction for control channel operations to enable testing

use std::io;
use std::os::unix::io::RawFd;

/// Trait for control channel I/O operations
pub trait ControlChannel: Send {
    /// Descriptor that becomes readable when a command is pending
    fn raw_fd(&self) -> RawFd;

    /// Receive one command line, without interpreting it
    fn recv_line(&mut self) -> io::Result<String>;

    /// Close the channel and remove its backing resource
    ///
    /// Closing an already closed channel does nothing.
    fn close(&mut self) -> io::Result<()>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Descriptor reported by [`MockControl`].
    pub const MOCK_CONTROL_FD: RawFd = 101;

    /// Mock control channel for testing
    #[derive(Clone)]
    pub struct MockControl {
        pub lines: Arc<Mutex<VecDeque<io::Result<String>>>>,
        pub close_calls: Arc<Mutex<usize>>,
        pub removed: Arc<Mutex<usize>>,
        open: Arc<Mutex<bool>>,
    }

    impl MockControl {
        pub fn new() -> Self {
            Self {
                lines: Arc::new(Mutex::new(VecDeque::new())),
                close_calls: Arc::new(Mutex::new(0)),
                removed: Arc::new(Mutex::new(0)),
                open: Arc::new(Mutex::new(true)),
            }
        }

        pub fn push_line(&self, line: &str) {
            self.lines.lock().unwrap().push_back(Ok(line.to_string()));
        }

        pub fn push_error(&self, kind: io::ErrorKind) {
            self.lines
                .lock()
                .unwrap()
                .push_back(Err(io::Error::new(kind, "Mock recv error")));
        }

        pub fn close_count(&self) -> usize {
            *self.close_calls.lock().unwrap()
        }

        pub fn removed_count(&self) -> usize {
            *self.removed.lock().unwrap()
        }
    }

    impl ControlChannel for MockControl {
        fn raw_fd(&self) -> RawFd {
            MOCK_CONTROL_FD
        }

        fn recv_line(&mut self) -> io::Result<String> {
            self.lines
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(io::Error::from(io::ErrorKind::WouldBlock)))
        }

        fn close(&mut self) -> io::Result<()> {
            *self.close_calls.lock().unwrap() += 1;
            let mut open = self.open.lock().unwrap();
            if *open {
                *open = false;
                *self.removed.lock().unwrap() += 1;
            }
            Ok(())
        }
    }
}
