/*!
 * IPC Probe Library
 *
 * Role arbitration and a deadline-bounded rendezvous over kernel IPC objects:
 * POSIX and System V message queues, POSIX and System V semaphores, and
 * abstract-namespace domain sockets.
 */

pub mod cli;
pub mod config;
pub mod core;
pub mod ipc;
pub mod monitoring;
pub mod probe;
pub mod signals;

// Re-exports
pub use cli::Cli;
pub use config::{parse_timeout, ProbeConfig, ProbeConfigBuilder};
pub use crate::core::errors::{ProbeError, ProbeResult};
pub use crate::core::types::{BackendKind, ExitStatus, Role};
pub use ipc::{IpcError, IpcObjectName, IpcResult, Message, TransportBackend};
pub use monitoring::init_tracing;
pub use probe::{run, ConsoleObserver, NullObserver, Probe, ProbeEvent, ProbeObserver, ProbeReport};
pub use signals::CancellationToken;
