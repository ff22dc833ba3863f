/*!
 * Probe Limits and Constants
 *
 * Centralized location for default names, timeouts, permissions and message
 * sizes shared by every transport backend.
 *
 * - Values matching kernel defaults are marked with [LINUX-COMPAT]
 * - Values fixed by the wire format are marked with [WIRE]
 */

use std::time::Duration;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Default rendezvous timeout for queue and semaphore probes (5 seconds)
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default poll timeout for the socket probe (2 seconds)
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound accepted on the command line (1 day)
pub const MAX_PROBE_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Re-trigger interval of the alarm timer once the deadline has passed (100ms)
/// A blocking call entered just after the first SIGALRM is still interrupted
pub const ALARM_RETRIGGER_INTERVAL: Duration = Duration::from_millis(100);

// =============================================================================
// MESSAGE SIZES
// =============================================================================

/// Maximum encoded message size (512 bytes) [WIRE]
/// Also the `mq_msgsize` attribute of POSIX queues created by the probe
pub const MAX_MESSAGE_SIZE: usize = 512;

/// Maximum client payload (200 bytes) [WIRE]
pub const MAX_PAYLOAD_SIZE: usize = 200;

/// Maximum object name length accepted from the command line
/// Leaves room for the reply-queue suffix inside one encoded message
pub const MAX_NAME_LEN: usize = 200;

/// Maximum abstract socket name (sun_path minus the leading NUL) [LINUX-COMPAT]
pub const MAX_ABSTRACT_NAME_LEN: usize = 107;

/// POSIX queue depth (10 messages) [LINUX-COMPAT]
/// Matches the default of /proc/sys/fs/mqueue/msg_max
pub const DEFAULT_QUEUE_DEPTH: usize = 10;

/// Listen backlog of the socket probe
pub const SOCKET_BACKLOG: i32 = 4;

// =============================================================================
// PERMISSIONS
// =============================================================================

/// Queue permissions (rw for owner and group)
pub const QUEUE_PERMISSIONS: u32 = 0o660;

/// Named semaphore permissions (rw for owner)
pub const NAMED_SEMAPHORE_PERMISSIONS: u32 = 0o600;

/// System V semaphore permissions (rw for everyone)
pub const SYSV_SEMAPHORE_PERMISSIONS: u32 = 0o666;

// =============================================================================
// DEFAULT NAMES
// =============================================================================

pub const DEFAULT_POSIX_QUEUE_NAME: &str = "server-queue";
pub const DEFAULT_SYSV_QUEUE_NAME: &str = "msg_queue_server_key";
pub const DEFAULT_POSIX_SEMAPHORE_NAME: &str = "ipc-probe-sem";
pub const DEFAULT_SYSV_SEMAPHORE_NAME: &str = "semaphore_key";
pub const DEFAULT_SOCKET_NAME: &str = "sock_test";

/// Message sent by the client when none is given
pub const DEFAULT_CLIENT_MESSAGE: &str = "This is a client-to-server message";

/// Extension of the System V key marker file
pub const MARKER_FILE_EXTENSION: &str = "key";

/// Environment variable overriding the marker directory
pub const KEY_DIR_ENV: &str = "PROBE_KEY_DIR";

/// Marker files default to the working directory the two sides share
pub const DEFAULT_KEY_DIR: &str = ".";
