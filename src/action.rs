//! # Actions
//!
//! Semantic actions produced by the event source and the executor that
//! carries them out.

use std::io;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::mapping::{ActionKind, ActionSpec};

/// Edge of a semantic transition; also used as the state of an axis latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The input became active (button pressed, axis entered an endpoint zone).
    Down,
    /// The input became inactive.
    Up,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Down => write!(f, "down"),
            Direction::Up => write!(f, "up"),
        }
    }
}

/// An action ready to be executed, together with the edge that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub spec: ActionSpec,
    pub direction: Direction,
}

impl Action {
    #[must_use]
    pub fn new(spec: ActionSpec, direction: Direction) -> Self {
        Self { spec, direction }
    }

    #[must_use]
    pub fn down(spec: ActionSpec) -> Self {
        Self::new(spec, Direction::Down)
    }

    #[must_use]
    pub fn up(spec: ActionSpec) -> Self {
        Self::new(spec, Direction::Up)
    }
}

/// Runs actions handed back by the event source.
///
/// `exec` actions are started on the down edge as `<shell> -c <target>`
/// and are not waited for. Up edges carry no work for `exec`.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    shell: String,
}

impl ActionExecutor {
    #[must_use]
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// Executes one action.
    ///
    /// Returns the spawned child, or `None` when the action has nothing to
    /// do for this direction. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the spawn error if the shell cannot be started.
    pub fn execute(&self, action: &Action) -> io::Result<Option<Child>> {
        match (action.spec.kind, action.direction) {
            (ActionKind::Exec, Direction::Down) => {
                info!("Executing action {}: {}", action.spec.id, action.spec.target);
                let child = Command::new(&self.shell)
                    .arg("-c")
                    .arg(&action.spec.target)
                    .stdin(Stdio::null())
                    .spawn()?;
                Ok(Some(child))
            }
            (ActionKind::Exec, Direction::Up) => {
                debug!("Ignoring release of action {}", action.spec.id);
                Ok(None)
            }
        }
    }
}
