//! # evmapd
//!
//! Map buttons and analog axes of Linux input devices to user-defined
//! actions.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load daemon settings and set up logging
//!    - Open every requested device, bind its control socket and load its
//!      default configuration
//!
//! 2. **Main Loop** (single thread)
//!    - Wait for device events, control commands or the next delayed
//!      action deadline of each event source
//!    - Execute the actions each source hands back
//!    - Drop a source whose device fails, leaving the others running
//!
//! 3. **Graceful Shutdown**
//!    - On Ctrl+C, release every grabbed device and remove control sockets
//!
//! # Examples
//!
//! ```bash
//! evmapd generate /dev/input/event3
//! evmapd run /dev/input/event3 /dev/input/event4
//! evmapd reload /dev/input/event3 racing.json
//! ```

use std::future;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use evmapd::action::{Action, ActionExecutor};
use evmapd::config::{Config, LoggingConfig};
use evmapd::control::{send_reload, socket_path, UnixControlSocket};
use evmapd::controller::device::{EvdevInput, InputDevice};
use evmapd::mapping::{self, JsonLoader};
use evmapd::source::EventSource;

/// Descriptor owned by an [`EventSource`], registered for readiness only.
///
/// The source keeps ownership; the registration must be dropped before
/// [`EventSource::cleanup`] closes the descriptor.
struct SourceFd(RawFd);

impl AsRawFd for SourceFd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

#[derive(Debug, Parser)]
#[command(name = "evmapd", version, about = "Map input device events to actions")]
struct Cli {
    /// Daemon settings file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Map events from one or more input devices
    Run {
        /// Device nodes, e.g. /dev/input/event3
        #[arg(required = true)]
        devices: Vec<PathBuf>,
    },
    /// Write the default configuration for a device
    Generate {
        /// Device node to introspect
        device: PathBuf,
    },
    /// Ask a running daemon to reload a device's configuration
    Reload {
        /// Device node the daemon is handling
        device: PathBuf,
        /// Configuration file name; omit to reload the default
        #[arg(default_value = "")]
        name: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())
        .context("Failed to load settings")?;
    let _log_guard = init_logging(&config.logging);

    match cli.command {
        Command::Run { devices } => run(&config, &devices).await,
        Command::Generate { device } => generate(&config, &device),
        Command::Reload { device, name } => {
            send_reload(socket_path(&config.socket_dir(), &device), &name)?;
            Ok(())
        }
    }
}

/// Logs to stderr, plus a daily rolling file when `log_dir` is set.
///
/// `RUST_LOG` overrides the configured level.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let (file_layer, guard) = if logging.log_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&logging.log_dir, &logging.file_prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

async fn run(config: &Config, devices: &[PathBuf]) -> Result<()> {
    info!("evmapd v{} starting...", env!("CARGO_PKG_VERSION"));

    let executor = ActionExecutor::new(config.actions.shell.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();

    for path in devices {
        match open_source(config, path) {
            Ok(source) => {
                tasks.spawn(drive(source, executor.clone(), shutdown_rx.clone()));
            }
            Err(e) => error!("{}: {:#}", path.display(), e),
        }
    }

    if tasks.is_empty() {
        bail!("No usable input devices");
    }
    info!("Handling {} device(s), press Ctrl+C to exit", tasks.len());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            joined = tasks.join_next() => match joined {
                Some(Ok(name)) => info!("{}: event source stopped", name),
                Some(Err(e)) => error!("Event source task failed: {}", e),
                None => {
                    info!("No event sources left, exiting");
                    break;
                }
            },
            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, shutting down...");
                let _ = shutdown_tx.send(true);
                while let Some(joined) = tasks.join_next().await {
                    if let Err(e) = joined {
                        error!("Event source task failed: {}", e);
                    }
                }
                break;
            }
        }
    }

    Ok(())
}

fn open_source(config: &Config, path: &Path) -> Result<EventSource> {
    let device = EvdevInput::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let control = UnixControlSocket::bind(socket_path(&config.socket_dir(), path))?;
    let source = EventSource::new(
        Box::new(device),
        Box::new(control),
        Box::new(JsonLoader),
        config.config_dir(),
    )?;
    Ok(source)
}

/// Runs one event source until its device fails or shutdown is requested,
/// then cleans it up. Returns the device name for reporting.
async fn drive(
    mut source: EventSource,
    executor: ActionExecutor,
    mut shutdown: watch::Receiver<bool>,
) -> String {
    let name = source.device_name().to_string();
    if let Err(e) = multiplex(&mut source, &executor, &mut shutdown).await {
        error!("{}: {:#}", name, e);
    }
    source.cleanup();
    name
}

async fn multiplex(
    source: &mut EventSource,
    executor: &ActionExecutor,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<()> {
    let (Some(device_fd), Some(control_fd)) = (source.device_fd(), source.control_fd()) else {
        return Ok(());
    };
    let device_io = AsyncFd::with_interest(SourceFd(device_fd), Interest::READABLE)?;
    let control_io = AsyncFd::with_interest(SourceFd(control_fd), Interest::READABLE)?;

    loop {
        let deadline = source.next_deadline().map(Instant::from_std);

        tokio::select! {
            ready = device_io.readable() => {
                let mut guard = ready?;
                match source.process(device_fd) {
                    Ok(actions) => execute_all(executor, &actions),
                    Err(e) if e.is_would_block() => guard.clear_ready(),
                    Err(e) => return Err(e.into()),
                }
            }
            ready = control_io.readable() => {
                let mut guard = ready?;
                match source.process(control_fd) {
                    Ok(_) => {}
                    Err(e) if e.is_would_block() => guard.clear_ready(),
                    Err(e) => {
                        warn!("{}: {}", source.device_name(), e);
                        guard.clear_ready();
                    }
                }
            }
            _ = wait_for(deadline) => {
                let due = source.fire_due(std::time::Instant::now());
                execute_all(executor, &due);
            }
            _ = shutdown.changed() => return Ok(()),
        }
    }
}

/// Sleeps until `deadline`, or forever when nothing is pending.
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}

fn execute_all(executor: &ActionExecutor, actions: &[Action]) {
    for action in actions {
        if let Err(e) = executor.execute(action) {
            warn!("Failed to execute '{}': {}", action.spec.target, e);
        }
    }
}

fn generate(config: &Config, path: &Path) -> Result<()> {
    let device = EvdevInput::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let capabilities = device.capabilities()?;
    let written = mapping::create(&config.config_dir(), device.name(), &capabilities)?;
    info!("Wrote default configuration for {} to {}", device.name(), written.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_devices() {
        let cli = Cli::try_parse_from(["evmapd", "run", "/dev/input/event3", "/dev/input/event4"])
            .unwrap();
        match cli.command {
            Command::Run { devices } => assert_eq!(devices.len(), 2),
            other => panic!("Expected run, got: {:?}", other),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_run_requires_device() {
        assert!(Cli::try_parse_from(["evmapd", "run"]).is_err());
    }

    #[test]
    fn test_parse_reload_defaults_to_empty_name() {
        let cli = Cli::try_parse_from(["evmapd", "reload", "/dev/input/event3"]).unwrap();
        match cli.command {
            Command::Reload { name, .. } => assert!(name.is_empty()),
            other => panic!("Expected reload, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_config_flag() {
        let cli = Cli::try_parse_from([
            "evmapd",
            "generate",
            "/dev/input/event3",
            "--config",
            "/etc/evmapd.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/evmapd.toml")));
    }

    #[tokio::test]
    async fn test_wait_for_deadline() {
        let deadline = Instant::now() + std::time::Duration::from_millis(20);
        wait_for(Some(deadline)).await;
        assert!(Instant::now() >= deadline);
    }

    #[tokio::test]
    async fn test_wait_for_nothing_never_completes() {
        let result = tokio::time::timeout(std::time::Duration::from_millis(50), wait_for(None)).await;
        assert!(result.is_err());
    }
}
