/*!
 * IPC Types
 * Names, messages and outcomes shared by every transport backend
 */

use crate::core::limits::{DEFAULT_QUEUE_DEPTH, MAX_MESSAGE_SIZE};
use miette::Diagnostic;
use nix::errno::Errno;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// IPC operation result
pub type IpcResult<T> = Result<T, IpcError>;

/// Unified backend error type with miette diagnostics
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum IpcError {
    /// Exclusive creation lost the race
    #[error("IPC object already exists: {0}")]
    #[diagnostic(
        code(ipc::already_exists),
        help("A peer (or a stale run) created this object first.")
    )]
    AlreadyExists(String),

    #[error("IPC object not found: {0}")]
    #[diagnostic(
        code(ipc::not_found),
        help("The object was removed or never created. Check that both sides use the same name.")
    )]
    NotFound(String),

    /// System call failure
    #[error("{op} failed: {errno}")]
    #[diagnostic(code(ipc::os_error))]
    Os { op: &'static str, errno: Errno },

    #[error("Invalid IPC object name '{name}': {reason}")]
    #[diagnostic(
        code(ipc::invalid_name),
        help("Use a short name without '/' characters.")
    )]
    InvalidName { name: String, reason: &'static str },

    #[error("Message of {size} bytes exceeds the {max} byte limit")]
    #[diagnostic(code(ipc::message_too_large), help("Send a shorter message."))]
    MessageTooLarge { size: usize, max: usize },

    #[error("Malformed message: {0}")]
    #[diagnostic(
        code(ipc::codec),
        help("The peer is probably a different build or another program using the same object.")
    )]
    Codec(String),

    #[error("Operation not supported by this backend: {0}")]
    #[diagnostic(code(ipc::unsupported))]
    Unsupported(&'static str),

    #[error("IPC handle already released: {0}")]
    #[diagnostic(code(ipc::closed))]
    Closed(String),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(ipc::io_error),
        help("Filesystem operation failed. Check permissions of the key directory.")
    )]
    Io(String),
}

impl IpcError {
    #[inline]
    pub fn os(op: &'static str, errno: Errno) -> Self {
        Self::Os { op, errno }
    }

    /// Build an error from the calling thread's `errno`
    #[inline]
    pub fn last_os(op: &'static str) -> Self {
        Self::Os {
            op,
            errno: Errno::last(),
        }
    }

    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::Os { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IpcError {
    fn from(err: std::io::Error) -> Self {
        IpcError::Io(err.to_string())
    }
}

impl From<bincode::Error> for IpcError {
    fn from(err: bincode::Error) -> Self {
        IpcError::Codec(err.to_string())
    }
}

/// Resolved identifier of a kernel-persistent object
///
/// Produced by the key resolver; both processes must resolve the same
/// command-line name to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpcObjectName {
    /// POSIX object name with its leading slash (`/name`)
    Path(String),
    /// Abstract-namespace socket name, without the leading NUL
    Abstract(String),
    /// System V key derived from a marker file
    Key { label: String, key: i32 },
    /// System V identifier of an `IPC_PRIVATE` object
    Private(i32),
}

impl IpcObjectName {
    /// Short human readable label for logs
    pub fn label(&self) -> String {
        match self {
            Self::Path(path) => path.clone(),
            Self::Abstract(name) => format!("@{}", name),
            Self::Key { label, key } => format!("{} (key {:#x})", label, key),
            Self::Private(id) => format!("private id {}", id),
        }
    }
}

impl fmt::Display for IpcObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Address of the object the server must reply to
pub type ReplyAddress = IpcObjectName;

/// One exchanged message
///
/// Queue backends carry a payload and the client's reply address; semaphore
/// and socket backends exchange an empty signal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    pub payload: Vec<u8>,
    pub reply_to: Option<ReplyAddress>,
}

impl Message {
    /// Payload-less rendezvous event
    #[inline]
    #[must_use]
    pub fn signal() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            reply_to: None,
        }
    }

    /// Client request carrying the reply address
    #[inline]
    #[must_use]
    pub fn request(payload: impl Into<Vec<u8>>, reply_to: ReplyAddress) -> Self {
        Self {
            payload: payload.into(),
            reply_to: Some(reply_to),
        }
    }

    #[inline]
    pub fn is_signal(&self) -> bool {
        self.payload.is_empty() && self.reply_to.is_none()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Outcome of an exclusive creation attempt
#[derive(Debug)]
pub enum CreateOutcome<H> {
    Created(H),
    AlreadyExists,
}

/// Outcome of a single bounded receive attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Message(Message),
    /// Deadline reached or timeout token cancelled
    TimedOut,
    /// Interrupted by a signal that was not the timeout
    Interrupted,
}

/// How the two sides interact once roles are decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// Client sends a request with a reply address, server answers
    RequestReply,
    /// Client increments a count, server's wait returns
    Signal,
    /// Client connects, server's accept returns
    Connect,
}

/// How a backend bounds its blocking receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutMechanism {
    /// The backend has an absolute-deadline or poll primitive
    Native,
    /// The backend blocks until SIGALRM interrupts it
    Alarm,
}

/// Sizing requested at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityHints {
    pub max_messages: usize,
    pub message_size: usize,
}

impl Default for CapacityHints {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_QUEUE_DEPTH,
            message_size: MAX_MESSAGE_SIZE,
        }
    }
}
