/*!
 * Core Types
 * Roles, backend kinds and exit statuses shared across the probe
 */

use super::limits::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::ExitCode;
use std::time::Duration;

/// Side of the rendezvous a process plays
///
/// Decided once by the exclusive-create race and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Created the object, waits for the peer and destroys the object
    Server,
    /// Found the object already present, signals the server
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kernel IPC mechanism probed by one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// POSIX message queue (mq_open)
    #[value(name = "posix-mq")]
    PosixMq,
    /// System V message queue (msgget)
    #[value(name = "sysv-mq")]
    SysvMq,
    /// POSIX named semaphore (sem_open)
    #[value(name = "posix-sem")]
    PosixSem,
    /// System V semaphore set (semget)
    #[value(name = "sysv-sem")]
    SysvSem,
    /// Abstract-namespace AF_UNIX stream socket
    #[value(name = "socket")]
    Socket,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PosixMq => "posix-mq",
            Self::SysvMq => "sysv-mq",
            Self::PosixSem => "posix-sem",
            Self::SysvSem => "sysv-sem",
            Self::Socket => "socket",
        }
    }

    /// Object name used when none is given on the command line
    pub fn default_name(&self) -> &'static str {
        match self {
            Self::PosixMq => DEFAULT_POSIX_QUEUE_NAME,
            Self::SysvMq => DEFAULT_SYSV_QUEUE_NAME,
            Self::PosixSem => DEFAULT_POSIX_SEMAPHORE_NAME,
            Self::SysvSem => DEFAULT_SYSV_SEMAPHORE_NAME,
            Self::Socket => DEFAULT_SOCKET_NAME,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        match self {
            Self::Socket => DEFAULT_SOCKET_TIMEOUT,
            _ => DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// System V objects are addressed by a key derived from a marker file
    #[inline]
    pub fn needs_key_file(&self) -> bool {
        matches!(self, Self::SysvMq | Self::SysvSem)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process exit status
///
/// A closed set so a driving harness can tell failure classes apart without
/// parsing output.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    Success = 0,
    Creation = 1,
    Race = 2,
    Send = 3,
    Receive = 4,
    Timeout = 5,
    Cleanup = 6,
    Usage = 7,
}

impl ExitStatus {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}
