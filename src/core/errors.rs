/*!
 * Error Types
 * Probe failure taxonomy with miette diagnostics and exit-code mapping
 */

use super::types::{BackendKind, ExitStatus};
use crate::ipc::IpcError;
use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

/// Probe result
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Terminal probe failures
///
/// Every variant maps to one process exit status. Detection is terminal; only
/// the rendezvous retries interruptions internally.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ProbeError {
    #[error("Invalid arguments: {0}")]
    #[diagnostic(
        code(probe::usage),
        help("Run with --help for the accepted backends, names and timeouts.")
    )]
    Usage(String),

    /// Exclusive creation failed for a reason other than "already exists"
    #[error("Failed to create {kind} object {name}")]
    #[diagnostic(
        code(probe::creation_failed),
        help("Check permissions, IPC limits (ipcs -l) and that the name is valid.")
    )]
    Creation {
        kind: BackendKind,
        name: String,
        #[source]
        source: IpcError,
    },

    /// Object existed at create time but could not be opened
    #[error("Object {name} vanished between create and open")]
    #[diagnostic(
        code(probe::race),
        help("A server exited or removed the object concurrently. Run the probe again.")
    )]
    Race {
        name: String,
        #[source]
        source: IpcError,
    },

    #[error("Failed to send {what}")]
    #[diagnostic(code(probe::send_failed))]
    Send {
        what: &'static str,
        #[source]
        source: IpcError,
    },

    #[error("Failed to receive {what}")]
    #[diagnostic(code(probe::receive_failed))]
    Receive {
        what: &'static str,
        #[source]
        source: IpcError,
    },

    #[error("Timed out after {timeout:?} waiting for {what}")]
    #[diagnostic(
        code(probe::timeout),
        help("No peer showed up in time. Start the other side or raise the timeout.")
    )]
    Timeout { what: &'static str, timeout: Duration },

    #[error("Failed to clean up {name}")]
    #[diagnostic(
        code(probe::cleanup_failed),
        help("The object may still exist. Inspect it with ipcs or /dev/mqueue and remove it by hand.")
    )]
    Cleanup {
        name: String,
        #[source]
        source: IpcError,
    },
}

impl ProbeError {
    /// Exit status reported for this failure
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Self::Usage(_) => ExitStatus::Usage,
            Self::Creation { .. } => ExitStatus::Creation,
            Self::Race { .. } => ExitStatus::Race,
            Self::Send { .. } => ExitStatus::Send,
            Self::Receive { .. } => ExitStatus::Receive,
            Self::Timeout { .. } => ExitStatus::Timeout,
            Self::Cleanup { .. } => ExitStatus::Cleanup,
        }
    }

    #[inline]
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }
}
