/*!
 * Transport Backends
 * One `TransportBackend` implementation per kernel IPC mechanism
 */

pub mod posix_mq;
pub mod posix_sem;
pub mod socket;
pub mod sysv_mq;
pub mod sysv_sem;

pub use posix_mq::{PosixQueueBackend, PosixQueueHandle};
pub use posix_sem::{NamedSemaphoreBackend, NamedSemaphoreHandle};
pub use socket::{AbstractSocketBackend, SocketHandle};
pub use sysv_mq::{SysvQueueBackend, SysvQueueHandle};
pub use sysv_sem::{SysvSemaphoreBackend, SysvSemaphoreHandle};
